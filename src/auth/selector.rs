//! Interactive and preference-based role selection

use super::types::{AuthError, AuthResult, RoleGrant};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use tracing::debug;

/// Picks one role/provider pair out of the extracted grants
pub struct RoleSelector {
    theme: ColorfulTheme,
}

impl RoleSelector {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Select a grant, applying the configured preference first.
    ///
    /// With a preference set, the first grant whose role ARN contains it
    /// wins and there is no fallback. Without one, a single grant is
    /// returned silently and multiple grants prompt the user once; a
    /// malformed choice fails the whole flow rather than re-prompting.
    pub fn select(&self, grants: &[RoleGrant], preferred: Option<&str>) -> AuthResult<RoleGrant> {
        if let Some(preferred) = preferred.filter(|p| !p.is_empty()) {
            debug!("selecting role by configured preference: {preferred}");
            return grants
                .iter()
                .find(|g| g.role_arn.contains(preferred))
                .cloned()
                .ok_or_else(|| AuthError::RoleNotFound(preferred.to_string()));
        }

        if grants.len() == 1 {
            return Ok(grants[0].clone());
        }

        println!();
        println!("Available AWS roles:");
        for (i, grant) in grants.iter().enumerate() {
            println!("  [{}] {}", i + 1, grant.role_arn);
        }
        println!();

        let input: String = Input::with_theme(&self.theme)
            .with_prompt("Select a role")
            .default("1".to_string())
            .allow_empty(true)
            .interact_text()
            .map_err(|e| AuthError::Interactive(format!("role prompt failed: {e}")))?;

        apply_selection(grants, &input)
    }
}

impl Default for RoleSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a 1-indexed choice string against the grant list. Empty input
/// defaults to the first grant; anything non-numeric or out of range is
/// fatal.
pub(crate) fn apply_selection(grants: &[RoleGrant], input: &str) -> AuthResult<RoleGrant> {
    let trimmed = input.trim();
    let choice = if trimmed.is_empty() {
        1
    } else {
        trimmed
            .parse::<usize>()
            .map_err(|_| AuthError::InvalidSelection)?
    };

    if choice < 1 || choice > grants.len() {
        return Err(AuthError::InvalidSelection);
    }
    Ok(grants[choice - 1].clone())
}
