//! Authentication-related types and data structures
//!
//! This module defines the types used throughout the auth module
//! including flow selection, provider responses, and error types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Well-known SAML attribute carrying the role/provider ARN pairs
pub const ROLE_ATTRIBUTE_NAME: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// Authentication flow selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Resolve to Oidc or SamlBrowser based on configured fields
    Auto,
    /// OIDC device authorization grant
    Oidc,
    /// Browser-based SAML delivery through the local callback server
    SamlBrowser,
}

impl AuthFlow {
    /// Parse a configured flow name. Accepts `saml_browser` as an alias
    /// for `saml-browser`.
    pub fn parse(value: &str) -> AuthResult<Self> {
        match value {
            "auto" => Ok(Self::Auto),
            "oidc" => Ok(Self::Oidc),
            "saml-browser" | "saml_browser" => Ok(Self::SamlBrowser),
            other => Err(AuthError::Config(format!(
                "unknown authentication flow: {other} (valid options: oidc, saml-browser, auto)"
            ))),
        }
    }
}

/// Device authorization response from the provider
///
/// Immutable once received; the device code is only ever used as the poll
/// key and is never displayed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub interval: u64,
}

/// Token endpoint response while polling the device grant
#[derive(Debug, Deserialize)]
pub struct TokenPollResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// One authorizable role/provider pair extracted from a SAML assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role_arn: String,
    pub principal_arn: String,
}

/// Temporary credentials returned by the STS exchange
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemporaryCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid configuration for the resolved flow. Reported
    /// before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-reported failure: non-success HTTP status, terminal OAuth
    /// error code, or STS exchange failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Device-flow expiry or callback-wait deadline. Distinct from
    /// provider errors so the user knows to retry the whole flow.
    #[error("Authentication timed out")]
    Timeout,

    /// Assertion decode or XML parse failure
    #[error("Failed to parse SAML assertion: {0}")]
    Parse(String),

    /// The assertion carried no usable role attribute values
    #[error("No IAM roles found in SAML assertion")]
    NoRoles,

    /// A configured role preference matched none of the available roles
    #[error("Configured role {0} not found in available roles")]
    RoleNotFound(String),

    /// Interactive role choice was non-numeric or out of range
    #[error("Invalid role selection")]
    InvalidSelection,

    /// Callback server bind or transport failure
    #[error("Callback server error: {0}")]
    CallbackServer(String),

    /// Terminal interaction failure
    #[error("Interactive prompt failed: {0}")]
    Interactive(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flows() {
        assert_eq!(AuthFlow::parse("auto").unwrap(), AuthFlow::Auto);
        assert_eq!(AuthFlow::parse("oidc").unwrap(), AuthFlow::Oidc);
        assert_eq!(
            AuthFlow::parse("saml-browser").unwrap(),
            AuthFlow::SamlBrowser
        );
        assert_eq!(
            AuthFlow::parse("saml_browser").unwrap(),
            AuthFlow::SamlBrowser
        );
    }

    #[test]
    fn rejects_unknown_flow() {
        assert!(matches!(
            AuthFlow::parse("pkce"),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn device_authorization_defaults_missing_interval() {
        let body = r#"{
            "device_code": "dc-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://example.okta.com/activate",
            "expires_in": 600
        }"#;
        let auth: DeviceAuthorization = serde_json::from_str(body).unwrap();
        assert_eq!(auth.interval, 0);
        assert!(auth.verification_uri_complete.is_none());
        assert_eq!(auth.expires_in, 600);
    }
}
