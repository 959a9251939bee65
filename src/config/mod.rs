//! Configuration management for the fedcreds CLI

use crate::auth::DEFAULT_CALLBACK_PORT;
use crate::error::{CliError, Result};
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CLI configuration structure
///
/// Persisted as TOML under the user config directory; every field can
/// also be overridden per invocation through CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Authentication flow: auto, oidc, or saml-browser
    pub auth_flow: String,

    /// Okta organization domain (e.g. company.okta.com)
    pub org_domain: String,

    /// OIDC client id for the device authorization flow
    pub oidc_client_id: String,

    /// AWS account federation app id (e.g. exk123...)
    pub fed_app_id: String,

    /// Preferred IAM role; matched as a substring of the role ARN
    pub iam_role: String,

    /// AWS profile name used when writing the credentials file
    pub profile: String,

    /// STS session duration in seconds
    pub session_duration: i32,

    /// Credential output format: json or env
    pub format: String,

    /// AWS region for the STS call
    pub aws_region: String,

    /// Loopback port the browser extension delivers to
    pub callback_port: u16,

    /// Open the browser automatically
    pub open_browser: bool,

    /// Override command used to open URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_browser_command: Option<String>,

    /// Write credentials into ~/.aws/credentials instead of stdout
    pub write_aws_credentials: bool,

    /// Cache the OIDC access token after a successful poll
    pub cache_access_token: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            auth_flow: "auto".to_string(),
            org_domain: String::new(),
            oidc_client_id: String::new(),
            fed_app_id: String::new(),
            iam_role: String::new(),
            profile: "default".to_string(),
            session_duration: 3600,
            format: "env".to_string(),
            aws_region: String::new(),
            callback_port: DEFAULT_CALLBACK_PORT,
            open_browser: false,
            open_browser_command: None,
            write_aws_credentials: false,
            cache_access_token: false,
        }
    }
}

impl CliConfig {
    /// User config directory for this tool
    pub fn config_dir() -> std::io::Result<PathBuf> {
        let strategy = choose_base_strategy().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no home directory: {e}"))
        })?;
        Ok(strategy.config_dir().join("fedcreds"))
    }

    /// Default config file location
    pub fn config_path() -> std::io::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub async fn load_default() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?).await
    }

    /// Load configuration from a specific path, falling back to defaults
    /// when the file does not exist yet
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("loading configuration from: {}", path.display());

        if !path.exists() {
            debug!("configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(CliError::Io)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CliError::config(format!("failed to parse config: {e}")))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub async fn save_default(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to_path(&path).await?;
        Ok(path)
    }

    /// Save configuration to a specific path
    pub async fn save_to_path(&self, path: &Path) -> Result<()> {
        debug!("saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(CliError::Io)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("failed to serialize config: {e}")))?;
        tokio::fs::write(path, content).await.map_err(CliError::Io)?;

        info!("configuration saved");
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> Result<String> {
        match normalize_key(key).as_str() {
            "auth_flow" => Ok(self.auth_flow.clone()),
            "org_domain" => Ok(self.org_domain.clone()),
            "oidc_client_id" => Ok(self.oidc_client_id.clone()),
            "fed_app_id" => Ok(self.fed_app_id.clone()),
            "iam_role" => Ok(self.iam_role.clone()),
            "profile" => Ok(self.profile.clone()),
            "session_duration" => Ok(self.session_duration.to_string()),
            "format" => Ok(self.format.clone()),
            "aws_region" => Ok(self.aws_region.clone()),
            "callback_port" => Ok(self.callback_port.to_string()),
            "open_browser" => Ok(self.open_browser.to_string()),
            "open_browser_command" => {
                Ok(self.open_browser_command.clone().unwrap_or_default())
            }
            "write_aws_credentials" => Ok(self.write_aws_credentials.to_string()),
            "cache_access_token" => Ok(self.cache_access_token.to_string()),
            _ => Err(CliError::config(format!("unknown configuration key: {key}"))),
        }
    }

    /// Set a configuration value by key, validating the value shape
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_key(key).as_str() {
            "auth_flow" => {
                crate::auth::AuthFlow::parse(value)
                    .map_err(|_| CliError::config(
                        "invalid auth_flow: must be 'auto', 'oidc', or 'saml-browser'",
                    ))?;
                self.auth_flow = value.to_string();
            }
            "org_domain" => self.org_domain = value.to_string(),
            "oidc_client_id" => self.oidc_client_id = value.to_string(),
            "fed_app_id" => self.fed_app_id = value.to_string(),
            "iam_role" => self.iam_role = value.to_string(),
            "profile" => self.profile = value.to_string(),
            "session_duration" => {
                self.session_duration = value.parse().map_err(|_| {
                    CliError::config("invalid session_duration: must be a number")
                })?;
            }
            "format" => self.format = value.to_string(),
            "aws_region" => self.aws_region = value.to_string(),
            "callback_port" => {
                self.callback_port = value.parse().map_err(|_| {
                    CliError::config("invalid callback_port: must be a port number")
                })?;
            }
            "open_browser" => self.open_browser = parse_bool(value),
            "open_browser_command" => {
                self.open_browser_command = (!value.is_empty()).then(|| value.to_string());
            }
            "write_aws_credentials" => self.write_aws_credentials = parse_bool(value),
            "cache_access_token" => self.cache_access_token = parse_bool(value),
            _ => return Err(CliError::config(format!("unknown configuration key: {key}"))),
        }
        Ok(())
    }

    /// All keys accepted by `get`/`set`, in display order
    pub fn keys() -> &'static [&'static str] {
        &[
            "auth_flow",
            "org_domain",
            "oidc_client_id",
            "fed_app_id",
            "iam_role",
            "profile",
            "session_duration",
            "format",
            "aws_region",
            "callback_port",
            "open_browser",
            "open_browser_command",
            "write_aws_credentials",
            "cache_access_token",
        ]
    }
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace('-', "_")
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1")
}
