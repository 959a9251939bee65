use crate::cli::{commands::Commands, handlers};
use crate::config::CliConfig;
use crate::error::Result;
use clap::Parser;

/// fedcreds - federate an Okta session into temporary AWS credentials
#[derive(Parser, Debug)]
#[command(
    name = "fedcreds",
    version,
    about = "Federate an Okta session into temporary AWS credentials",
    long_about = "Authenticate against an Okta org and exchange the resulting SAML \
assertion for temporary AWS credentials via STS AssumeRoleWithSAML.

Running without a subcommand performs the authentication flow:
  fedcreds                          # auto-selected flow
  fedcreds -x oidc                  # force the device authorization flow
  fedcreds -x saml-browser          # force the browser SAML flow

CONFIGURATION:
  fedcreds config init              # interactive setup wizard
  fedcreds config set <key> <value> # set one value
  fedcreds config list              # show configuration"
)]
pub struct Args {
    /// Authentication flow: auto, oidc, or saml-browser
    #[arg(short = 'x', long, env = "FEDCREDS_AUTH_FLOW")]
    pub auth_flow: Option<String>,

    /// Okta organization domain
    #[arg(short = 'o', long, env = "FEDCREDS_ORG_DOMAIN")]
    pub org_domain: Option<String>,

    /// OIDC client ID
    #[arg(short = 'c', long, env = "FEDCREDS_OIDC_CLIENT_ID")]
    pub oidc_client_id: Option<String>,

    /// AWS account federation app ID
    #[arg(short = 'a', long, env = "FEDCREDS_FED_APP_ID")]
    pub fed_app_id: Option<String>,

    /// Preferred IAM role (matched as a substring of the role ARN)
    #[arg(short = 'r', long, env = "FEDCREDS_IAM_ROLE")]
    pub iam_role: Option<String>,

    /// AWS profile name
    #[arg(short = 'p', long, env = "FEDCREDS_PROFILE")]
    pub profile: Option<String>,

    /// Session duration in seconds
    #[arg(short = 's', long, env = "FEDCREDS_SESSION_DURATION")]
    pub session_duration: Option<i32>,

    /// Output format: json or env
    #[arg(short = 'f', long, env = "FEDCREDS_FORMAT")]
    pub format: Option<String>,

    /// AWS region
    #[arg(short = 'n', long, env = "FEDCREDS_AWS_REGION")]
    pub aws_region: Option<String>,

    /// Open the browser automatically
    #[arg(short = 'b', long)]
    pub open_browser: bool,

    /// Command used to open URLs instead of the platform default
    #[arg(short = 'm', long, env = "FEDCREDS_BROWSER_COMMAND")]
    pub open_browser_command: Option<String>,

    /// Write credentials to ~/.aws/credentials
    #[arg(short = 'w', long)]
    pub write_aws_credentials: bool,

    /// Cache the access token after a successful device flow
    #[arg(short = 'e', long)]
    pub cache_access_token: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to authenticating)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        // Initialize logging based on verbosity
        let log_level = if self.verbose { "debug" } else { "warn" };

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();

        match self.command {
            Some(Commands::Config { ref action }) => handlers::config::handle_config(action).await,
            None => {
                let config = self.effective_config().await?;
                handlers::auth::handle_authenticate(config).await
            }
        }
    }

    /// Merge persisted configuration with per-invocation overrides
    async fn effective_config(&self) -> Result<CliConfig> {
        let mut config = CliConfig::load_default().await?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(v) = &self.auth_flow {
            config.auth_flow = v.clone();
        }
        if let Some(v) = &self.org_domain {
            config.org_domain = v.clone();
        }
        if let Some(v) = &self.oidc_client_id {
            config.oidc_client_id = v.clone();
        }
        if let Some(v) = &self.fed_app_id {
            config.fed_app_id = v.clone();
        }
        if let Some(v) = &self.iam_role {
            config.iam_role = v.clone();
        }
        if let Some(v) = &self.profile {
            config.profile = v.clone();
            // Explicitly naming a profile selects the credentials-file
            // sink, without needing -w as well
            config.write_aws_credentials = true;
        }
        if let Some(v) = self.session_duration {
            config.session_duration = v;
        }
        if let Some(v) = &self.format {
            config.format = v.clone();
        }
        if let Some(v) = &self.aws_region {
            config.aws_region = v.clone();
        }
        if self.open_browser {
            config.open_browser = true;
        }
        if let Some(v) = &self.open_browser_command {
            config.open_browser_command = Some(v.clone());
        }
        if self.write_aws_credentials {
            config.write_aws_credentials = true;
        }
        if self.cache_access_token {
            config.cache_access_token = true;
        }
    }
}
