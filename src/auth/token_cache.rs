//! Short-lived access-token cache for the OIDC flow
//!
//! Written only when `cache_access_token` is enabled. The cache is
//! best-effort output: a write failure warns and never fails the flow,
//! and the flow never reads it back to skip authentication.

use super::types::AuthResult;
use crate::config::CliConfig;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Cached token entry
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    /// Unix timestamp after which the token should not be reused
    pub expires_at: i64,
}

/// Location of the token cache file
pub fn cache_path() -> AuthResult<PathBuf> {
    Ok(CliConfig::config_dir()?.join("token-cache.json"))
}

/// Persist the access token with a one hour lifetime.
pub async fn store_access_token(token: &str) -> AuthResult<PathBuf> {
    let path = cache_path()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let entry = CachedToken {
        access_token: token.to_string(),
        expires_at: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    let content = serde_json::to_string_pretty(&entry)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    tokio::fs::write(&path, content).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    debug!("cached access token at {}", path.display());
    Ok(path)
}
