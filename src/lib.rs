//! # fedcreds
//!
//! Command-line credential broker that federates an Okta identity-provider
//! session into temporary AWS credentials.
//!
//! Two authentication flows are supported, selected at runtime:
//! - OIDC device authorization: a device-code grant against the Okta org,
//!   polled until the user approves the session in a browser
//! - Browser SAML: a loopback callback server receives the SAML assertion
//!   from a cooperating browser extension
//!
//! Either way the SAML assertion is decoded, the available IAM roles are
//! extracted and one is selected, and the assertion is exchanged for
//! temporary credentials via STS `AssumeRoleWithSAML`.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;

pub use cli::*;
pub use error::*;
