//! Top-level authentication flow orchestration
//!
//! Resolves which flow to run, validates its prerequisites before any
//! network I/O, drives the flow to completion and hands the resulting
//! credentials to the configured output sink.

use super::callback_server::CallbackServer;
use super::device_flow::DeviceFlowPoller;
use super::saml;
use super::selector::RoleSelector;
use super::sts;
use super::token_cache;
use super::types::{AuthError, AuthFlow, AuthResult, TemporaryCredential};
use crate::config::CliConfig;
use crate::output::{self, print_info};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

/// How long the browser flow waits for the extension to deliver
const CALLBACK_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// App link entry from the provider's app listing API
#[derive(Debug, Deserialize)]
struct AppLink {
    #[serde(default)]
    label: String,
    #[serde(rename = "linkUrl", default)]
    link_url: String,
}

/// Drives one authentication run end to end
pub struct Authenticator {
    config: CliConfig,
    client: reqwest::Client,
}

impl Authenticator {
    pub fn new(config: CliConfig) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Run the resolved flow and emit the credentials.
    pub async fn authenticate(&self) -> crate::error::Result<()> {
        let flow = self.resolve_flow()?;
        debug!("using authentication flow: {flow:?}");

        let credential = match flow {
            AuthFlow::Oidc => self.authenticate_oidc().await?,
            AuthFlow::SamlBrowser => self.authenticate_browser().await?,
            // resolve_flow never returns Auto
            AuthFlow::Auto => unreachable!("auto flow must be resolved before dispatch"),
        };

        output::emit_credential(&credential, &self.config).await
    }

    /// Resolve `auto` and check the resolved flow's prerequisites. Fails
    /// fast, before any network I/O, on missing configuration.
    fn resolve_flow(&self) -> AuthResult<AuthFlow> {
        if self.config.org_domain.is_empty() {
            return Err(AuthError::Config(
                "org_domain is required (set it with 'fedcreds config set org_domain <domain>')"
                    .to_string(),
            ));
        }

        let flow = match AuthFlow::parse(&self.config.auth_flow)? {
            AuthFlow::Auto => {
                if !self.config.oidc_client_id.is_empty() {
                    AuthFlow::Oidc
                } else if !self.config.fed_app_id.is_empty() {
                    AuthFlow::SamlBrowser
                } else {
                    AuthFlow::Oidc
                }
            }
            explicit => explicit,
        };

        match flow {
            AuthFlow::Oidc if self.config.oidc_client_id.is_empty() => Err(AuthError::Config(
                "oidc_client_id is required for the OIDC flow".to_string(),
            )),
            AuthFlow::SamlBrowser if self.config.fed_app_id.is_empty() => Err(AuthError::Config(
                "fed_app_id is required for the browser SAML flow".to_string(),
            )),
            _ => Ok(flow),
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}", self.config.org_domain)
    }

    fn sso_url(&self, app_id: &str) -> String {
        format!("{}/app/amazon_aws/{app_id}/sso/saml", self.base_url())
    }

    /// OIDC device authorization: device grant, token poll, assertion
    /// fetch from the federation app's SSO page.
    async fn authenticate_oidc(&self) -> AuthResult<TemporaryCredential> {
        let poller = DeviceFlowPoller::new(
            self.client.clone(),
            self.base_url(),
            self.config.oidc_client_id.clone(),
        );

        let device_auth = poller.request_authorization().await?;
        poller.display_authorization(&device_auth, |url| {
            if self.config.open_browser {
                if let Err(e) = self.open_browser(url) {
                    warn!("failed to open browser: {e}");
                }
            }
        });

        let access_token = poller.poll(&device_auth).await?;
        debug!("access token obtained");

        if self.config.cache_access_token {
            if let Err(e) = token_cache::store_access_token(&access_token).await {
                warn!("failed to cache access token: {e}");
            }
        }

        let app_id = if self.config.fed_app_id.is_empty() {
            self.discover_fed_app(&access_token).await?
        } else {
            self.config.fed_app_id.clone()
        };

        let assertion = self.fetch_sso_assertion(&app_id, &access_token).await?;
        debug!("SAML assertion obtained");

        self.complete_exchange(&assertion).await
    }

    /// Browser SAML: bind the callback listener, point the browser at the
    /// SSO URL and wait for the extension to deliver the assertion. The
    /// listener is stopped on every exit path.
    async fn authenticate_browser(&self) -> AuthResult<TemporaryCredential> {
        let mut server = CallbackServer::bind(self.config.callback_port).await?;
        debug!("callback server bound on port {}", server.port());

        let sso_url = self.sso_url(&self.config.fed_app_id);
        print_info("Opening browser to the identity provider...");
        if let Err(e) = self.open_browser(&sso_url) {
            warn!("failed to open browser: {e}");
            println!("Please manually open: {sso_url}");
        }

        let delivery = server.wait_for_assertion(CALLBACK_WAIT_TIMEOUT).await;
        server.shutdown().await;
        let assertion = delivery?;
        debug!("SAML assertion received ({} bytes)", assertion.len());

        self.complete_exchange(&assertion).await
    }

    /// Shared tail of both flows: extract roles, select one, exchange.
    async fn complete_exchange(&self, assertion: &str) -> AuthResult<TemporaryCredential> {
        let grants = saml::extract_roles(assertion)?;
        debug!("found {} role(s)", grants.len());

        let grant = RoleSelector::new().select(&grants, Some(self.config.iam_role.as_str()))?;
        debug!("using role: {}", grant.role_arn);

        sts::assume_role_with_saml(
            assertion,
            &grant.role_arn,
            &grant.principal_arn,
            Some(self.config.aws_region.as_str()),
            self.config.session_duration,
        )
        .await
    }

    /// Find the AWS federation app in the user's app list when no app id
    /// is configured.
    async fn discover_fed_app(&self, access_token: &str) -> AuthResult<String> {
        let url = format!("{}/api/v1/users/me/appLinks", self.base_url());
        debug!("discovering AWS federation app via {url}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("failed to list apps: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(format!("failed to list apps: {e}")))?;
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "failed to list apps: HTTP {status}: {body}"
            )));
        }

        let apps: Vec<AppLink> = serde_json::from_str(&body)
            .map_err(|e| AuthError::Provider(format!("failed to parse apps response: {e}")))?;

        apps.iter()
            .find_map(find_fed_app_id)
            .ok_or_else(|| {
                AuthError::Provider("no AWS federation app found in the apps list".to_string())
            })
    }

    /// Fetch the federation app's SSO page and pull the assertion out of
    /// its hidden form field.
    async fn fetch_sso_assertion(&self, app_id: &str, access_token: &str) -> AuthResult<String> {
        let url = self.sso_url(app_id);
        debug!("fetching SAML assertion from {url}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("SAML request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "SAML request failed with status {status}"
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(format!("SAML request failed: {e}")))?;
        saml::extract_saml_from_html(&html)
    }

    /// Open a URL with the configured command or the platform default.
    fn open_browser(&self, url: &str) -> std::io::Result<()> {
        if let Some(command) = self
            .config
            .open_browser_command
            .as_deref()
            .filter(|c| !c.is_empty())
        {
            Command::new(command).arg(url).spawn()?;
            return Ok(());
        }
        webbrowser::open(url)
    }
}

/// Match an app link against the AWS federation app shape and extract
/// the app id from its link URL.
fn find_fed_app_id(app: &AppLink) -> Option<String> {
    if !app.label.to_lowercase().contains("aws") {
        return None;
    }
    let after = app.link_url.split("/app/amazon_aws/").nth(1)?;
    after
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
