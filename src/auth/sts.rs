//! STS exchange: trade a SAML assertion for temporary credentials

use super::types::{AuthError, AuthResult, TemporaryCredential};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::DateTime;
use tracing::{debug, info};

/// Call `AssumeRoleWithSAML` for the selected role.
///
/// Only the session duration is validated locally; the provider enforces
/// its own maximum and fails the call if it is exceeded. Provider errors
/// are fatal and never retried, since a blind retry would need a fresh
/// assertion anyway.
pub async fn assume_role_with_saml(
    assertion: &str,
    role_arn: &str,
    principal_arn: &str,
    region: Option<&str>,
    duration_seconds: i32,
) -> AuthResult<TemporaryCredential> {
    if duration_seconds <= 0 {
        return Err(AuthError::Config(format!(
            "session duration must be a positive number of seconds, got {duration_seconds}"
        )));
    }

    debug!("assuming role {role_arn} via {principal_arn} for {duration_seconds}s");

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region.filter(|r| !r.is_empty()) {
        loader = loader.region(Region::new(region.to_string()));
    }
    let config = loader.load().await;
    let client = StsClient::new(&config);

    let response = client
        .assume_role_with_saml()
        .role_arn(role_arn)
        .principal_arn(principal_arn)
        .saml_assertion(assertion)
        .duration_seconds(duration_seconds)
        .send()
        .await
        .map_err(|e| {
            AuthError::Provider(format!(
                "assume role with SAML failed: {}",
                DisplayErrorContext(&e)
            ))
        })?;

    let credentials = response
        .credentials()
        .ok_or_else(|| AuthError::Provider("STS returned no credentials".to_string()))?;

    let expiration = credentials.expiration();
    let expiration = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
        .ok_or_else(|| AuthError::Provider("STS returned an invalid expiration".to_string()))?;

    info!("assumed role {role_arn}, credentials expire at {expiration}");

    Ok(TemporaryCredential {
        access_key_id: credentials.access_key_id().to_string(),
        secret_access_key: credentials.secret_access_key().to_string(),
        session_token: credentials.session_token().to_string(),
        expiration,
    })
}
