//! OAuth device authorization grant against the identity provider
//!
//! Requests a device code, displays it to the user, then polls the token
//! endpoint until the user approves the session, the provider reports a
//! terminal error, or the authorization expires.

use super::types::{AuthError, AuthResult, DeviceAuthorization, TokenPollResponse};
use crate::output::print_info;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Poll interval used when the provider reports zero
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Scopes requested for the device grant
const DEVICE_FLOW_SCOPES: &str = "openid profile okta.apps.sso";

const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Executes the device authorization grant against one provider endpoint
pub struct DeviceFlowPoller {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl DeviceFlowPoller {
    /// Create a poller for the provider at `base_url` (scheme included,
    /// no trailing slash).
    pub fn new(client: reqwest::Client, base_url: String, client_id: String) -> Self {
        Self {
            client,
            base_url,
            client_id,
        }
    }

    /// Issue the device authorization request. Any non-success response is
    /// fatal; there is no retry at this stage.
    pub async fn request_authorization(&self) -> AuthResult<DeviceAuthorization> {
        let url = format!("{}/oauth2/v1/device/authorize", self.base_url);
        debug!("requesting device authorization from {url}");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", DEVICE_FLOW_SCOPES),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("device authorization request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(format!("device authorization request failed: {e}")))?;

        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "device authorization failed with status {status}: {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            AuthError::Provider(format!("failed to parse device authorization response: {e}"))
        })
    }

    /// Display the user code and verification URIs. Side effect only; a
    /// browser-open failure never aborts the flow.
    pub fn display_authorization(&self, auth: &DeviceAuthorization, open_browser: impl FnOnce(&str)) {
        println!();
        println!("To authenticate, visit:");
        println!();
        if let Some(complete) = &auth.verification_uri_complete {
            println!("  {complete}");
            println!();
        }
        println!(
            "Or go to {} and enter code: {}",
            auth.verification_uri, auth.user_code
        );
        println!();

        if let Some(complete) = &auth.verification_uri_complete {
            open_browser(complete);
        } else {
            open_browser(&auth.verification_uri);
        }
    }

    /// Poll the token endpoint until a token is issued, the provider
    /// reports a terminal error, or the authorization expires.
    ///
    /// A periodic ticker and the overall deadline run concurrently; the
    /// loop advances ticker-to-ticker, so no two attempts are ever in
    /// flight at once. Transient failures of a single attempt are
    /// swallowed and the loop continues at the next tick.
    pub async fn poll(&self, auth: &DeviceAuthorization) -> AuthResult<String> {
        let deadline = tokio::time::sleep(Duration::from_secs(auth.expires_in));
        tokio::pin!(deadline);

        let interval = poll_interval(auth);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        print_info("Waiting for authentication...");

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(AuthError::Timeout);
                }
                _ = ticker.tick() => {
                    match self.try_token(&auth.device_code).await? {
                        Some(token) => return Ok(token),
                        None => continue,
                    }
                }
            }
        }
    }

    /// One poll attempt. `Ok(None)` means keep polling: either the
    /// authorization is still pending or the attempt hit a transient
    /// local failure.
    async fn try_token(&self, device_code: &str) -> AuthResult<Option<String>> {
        let url = format!("{}/oauth2/v1/token", self.base_url);

        let response = match self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", device_code),
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("token poll attempt failed: {e}");
                return Ok(None);
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("token poll attempt failed reading body: {e}");
                return Ok(None);
            }
        };

        let parsed: TokenPollResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("token poll attempt returned malformed JSON: {e}");
                return Ok(None);
            }
        };

        evaluate_poll_response(parsed)
    }
}

/// Provider-specified interval, with the well-known 5 second fallback
/// when the provider reports zero.
pub(crate) fn poll_interval(auth: &DeviceAuthorization) -> Duration {
    if auth.interval == 0 {
        DEFAULT_POLL_INTERVAL
    } else {
        Duration::from_secs(auth.interval)
    }
}

/// Classify one token-endpoint response: token issued, still pending, or
/// a terminal provider error.
pub(crate) fn evaluate_poll_response(response: TokenPollResponse) -> AuthResult<Option<String>> {
    if let Some(token) = response.access_token {
        if !token.is_empty() {
            return Ok(Some(token));
        }
    }

    if let Some(error) = response.error {
        if error != "authorization_pending" && error != "slow_down" {
            let detail = response.error_description.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "authentication failed: {error} - {detail}"
            )));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_auth(interval: u64) -> DeviceAuthorization {
        DeviceAuthorization {
            device_code: "dc".to_string(),
            user_code: "CODE".to_string(),
            verification_uri: "https://example.okta.com/activate".to_string(),
            verification_uri_complete: None,
            expires_in: 600,
            interval,
        }
    }

    #[test]
    fn zero_interval_defaults_to_five_seconds() {
        assert_eq!(poll_interval(&device_auth(0)), Duration::from_secs(5));
    }

    #[test]
    fn provider_interval_is_respected() {
        assert_eq!(poll_interval(&device_auth(9)), Duration::from_secs(9));
    }

    #[test]
    fn token_wins_over_everything() {
        let response = TokenPollResponse {
            access_token: Some("tok".to_string()),
            error: None,
            error_description: None,
        };
        assert_eq!(evaluate_poll_response(response).unwrap(), Some("tok".to_string()));
    }

    #[test]
    fn pending_and_slow_down_keep_polling() {
        for code in ["authorization_pending", "slow_down"] {
            let response = TokenPollResponse {
                access_token: None,
                error: Some(code.to_string()),
                error_description: None,
            };
            assert_eq!(evaluate_poll_response(response).unwrap(), None);
        }
    }

    #[test]
    fn terminal_error_is_fatal() {
        let response = TokenPollResponse {
            access_token: None,
            error: Some("access_denied".to_string()),
            error_description: Some("user denied the request".to_string()),
        };
        assert!(matches!(
            evaluate_poll_response(response),
            Err(AuthError::Provider(_))
        ));
    }

    #[test]
    fn empty_response_keeps_polling() {
        let response = TokenPollResponse {
            access_token: None,
            error: None,
            error_description: None,
        };
        assert_eq!(evaluate_poll_response(response).unwrap(), None);
    }
}
