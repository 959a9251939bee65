//! Output formatting utilities and credential sinks

use crate::auth::TemporaryCredential;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use console::style;
use etcetera::{choose_base_strategy, BaseStrategy};
use std::path::{Path, PathBuf};
use tracing::info;

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message with red X
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Print an informational message with blue info icon
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Hand the credential to the sink selected by configuration: the
/// credentials file when a profile write is requested, otherwise stdout
/// as JSON or shell exports.
pub async fn emit_credential(credential: &TemporaryCredential, config: &CliConfig) -> Result<()> {
    if config.write_aws_credentials {
        let path = credentials_file_path()?;
        write_credentials_profile(credential, &config.profile, &path).await?;
        print_success(&format!(
            "Credentials written to profile '{}' in {}",
            config.profile,
            path.display()
        ));
        return Ok(());
    }

    match config.format.as_str() {
        "json" => emit_json(credential),
        _ => {
            emit_env(credential);
            Ok(())
        }
    }
}

fn emit_json(credential: &TemporaryCredential) -> Result<()> {
    let json = serde_json::to_string_pretty(credential)
        .map_err(|e| CliError::config(format!("failed to serialize credentials: {e}")))?;
    println!("{json}");
    Ok(())
}

fn emit_env(credential: &TemporaryCredential) {
    println!("export AWS_ACCESS_KEY_ID={}", credential.access_key_id);
    println!(
        "export AWS_SECRET_ACCESS_KEY={}",
        credential.secret_access_key
    );
    println!("export AWS_SESSION_TOKEN={}", credential.session_token);
}

/// Location of the shared AWS credentials file
fn credentials_file_path() -> Result<PathBuf> {
    let strategy = choose_base_strategy()
        .map_err(|e| CliError::config(format!("no home directory: {e}")))?;
    Ok(strategy.home_dir().join(".aws").join("credentials"))
}

/// Merge the profile section into the credentials file, preserving every
/// other section untouched.
pub async fn write_credentials_profile(
    credential: &TemporaryCredential,
    profile: &str,
    path: &Path,
) -> Result<()> {
    let profile = if profile.is_empty() { "default" } else { profile };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(CliError::Io)?;
    }

    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(CliError::Io(e)),
    };

    let updated = merge_profile_section(&existing, profile, credential);
    tokio::fs::write(path, updated).await.map_err(CliError::Io)?;

    info!("wrote credentials for profile {profile}");
    Ok(())
}

const CREDENTIAL_KEYS: [&str; 3] = [
    "aws_access_key_id",
    "aws_secret_access_key",
    "aws_session_token",
];

fn is_credential_key(line: &str) -> bool {
    let key = line.split('=').next().unwrap_or("").trim();
    CREDENTIAL_KEYS.contains(&key)
}

/// Set the three credential keys in one `[profile]` section of INI-style
/// content, appending the section if it does not exist. Other sections
/// and non-credential keys of the target section are left untouched.
fn merge_profile_section(
    existing: &str,
    profile: &str,
    credential: &TemporaryCredential,
) -> String {
    let header = format!("[{profile}]");
    let credential_lines = format!(
        "aws_access_key_id = {}\naws_secret_access_key = {}\naws_session_token = {}\n",
        credential.access_key_id, credential.secret_access_key, credential.session_token
    );

    let mut output = String::new();
    let mut in_target = false;
    let mut replaced = false;

    for line in existing.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_target = trimmed == header;
            if in_target {
                replaced = true;
                output.push_str(&header);
                output.push('\n');
                output.push_str(&credential_lines);
                continue;
            }
        }
        // Only the three credential keys are replaced; anything else in
        // the target section (region, output, ...) is kept.
        if in_target && is_credential_key(line) {
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }

    if !replaced {
        if !output.is_empty() && !output.ends_with("\n\n") {
            output.push('\n');
        }
        output.push_str(&header);
        output.push('\n');
        output.push_str(&credential_lines);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn credential() -> TemporaryCredential {
        TemporaryCredential {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn json_sink_uses_pascal_case_field_names() {
        let json = serde_json::to_string(&credential()).unwrap();
        assert!(json.contains("\"AccessKeyId\":\"AKIAEXAMPLE\""));
        assert!(json.contains("\"SecretAccessKey\""));
        assert!(json.contains("\"SessionToken\""));
        assert!(json.contains("\"Expiration\""));
    }

    #[test]
    fn appends_new_profile_section() {
        let merged = merge_profile_section("", "default", &credential());
        assert!(merged.starts_with("[default]\n"));
        assert!(merged.contains("aws_access_key_id = AKIAEXAMPLE"));
        assert!(merged.contains("aws_session_token = token"));
    }

    #[test]
    fn replaces_existing_section_and_keeps_others() {
        let existing = "[other]\naws_access_key_id = OLD1\n\n[default]\naws_access_key_id = OLD2\naws_secret_access_key = old\n";
        let merged = merge_profile_section(existing, "default", &credential());
        assert!(merged.contains("[other]\naws_access_key_id = OLD1"));
        assert!(merged.contains("aws_access_key_id = AKIAEXAMPLE"));
        assert!(!merged.contains("OLD2"));
    }

    #[test]
    fn preserves_unrelated_keys_in_target_section() {
        let existing = "[default]\nregion = us-west-2\naws_access_key_id = OLD\noutput = json\n";
        let merged = merge_profile_section(existing, "default", &credential());
        assert!(merged.contains("region = us-west-2"));
        assert!(merged.contains("output = json"));
        assert!(merged.contains("aws_access_key_id = AKIAEXAMPLE"));
        assert!(!merged.contains("OLD"));
        assert_eq!(merged.matches("[default]").count(), 1);
    }

    #[tokio::test]
    async fn writes_profile_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials");

        write_credentials_profile(&credential(), "staging", &path)
            .await
            .unwrap();
        write_credentials_profile(&credential(), "prod", &path)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("[staging]"));
        assert!(content.contains("[prod]"));
    }

    #[tokio::test]
    async fn empty_profile_name_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials");

        write_credentials_profile(&credential(), "", &path)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("[default]"));
    }
}
