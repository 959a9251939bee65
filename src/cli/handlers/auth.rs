//! Authentication command handler

use crate::auth::Authenticator;
use crate::config::CliConfig;
use crate::error::Result;
use tracing::debug;

/// Run the authentication flow with the effective configuration
pub async fn handle_authenticate(config: CliConfig) -> Result<()> {
    debug!("starting authentication");
    let authenticator = Authenticator::new(config)?;
    authenticator.authenticate().await
}
