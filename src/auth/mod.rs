//! Authentication flows and credential federation

pub mod callback_server;
pub mod device_flow;
pub mod flow;
pub mod saml;
pub mod selector;
pub mod sts;
pub mod token_cache;
pub mod types;

pub use callback_server::{CallbackServer, DEFAULT_CALLBACK_PORT};
pub use flow::Authenticator;
pub use types::{AuthError, AuthFlow, AuthResult, RoleGrant, TemporaryCredential};
