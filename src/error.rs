//! Error types for the fedcreds CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or key issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication/authorization issues
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Filesystem and process I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

impl CliError {
    /// Create a configuration error from any displayable message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
