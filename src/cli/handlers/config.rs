//! Configuration command handlers

use crate::cli::commands::ConfigAction;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::print_success;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

/// Dispatch a `config` subcommand
pub async fn handle_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => handle_init().await,
        ConfigAction::Set { key, value } => handle_set(key, value).await,
        ConfigAction::Get { key } => handle_get(key).await,
        ConfigAction::List => handle_list().await,
        ConfigAction::Path => handle_path(),
    }
}

/// Interactive setup wizard
async fn handle_init() -> Result<()> {
    println!("fedcreds configuration setup");
    println!("============================");
    println!();

    let theme = ColorfulTheme::default();
    let mut config = CliConfig::default();

    let flows = ["auto", "oidc", "saml-browser"];
    let flow = Select::with_theme(&theme)
        .with_prompt("Authentication flow")
        .items(&[
            "auto         - detect from configured fields (recommended)",
            "oidc         - OIDC device authorization flow",
            "saml-browser - browser-based SAML flow",
        ])
        .default(0)
        .interact()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;
    config.auth_flow = flows[flow].to_string();

    config.org_domain = Input::with_theme(&theme)
        .with_prompt("Okta organization domain (e.g. company.okta.com)")
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    if config.auth_flow != "saml-browser" {
        config.oidc_client_id = Input::with_theme(&theme)
            .with_prompt("OIDC client ID (optional)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;
    }

    config.fed_app_id = Input::with_theme(&theme)
        .with_prompt("AWS account federation app ID (e.g. exk123..., optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    config.iam_role = Input::with_theme(&theme)
        .with_prompt("Preferred IAM role ARN (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    config.aws_region = Input::with_theme(&theme)
        .with_prompt("AWS region")
        .default("us-east-1".to_string())
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    config.profile = Input::with_theme(&theme)
        .with_prompt("AWS profile name")
        .default("default".to_string())
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    let duration: String = Input::with_theme(&theme)
        .with_prompt("Session duration in seconds")
        .default("3600".to_string())
        .interact_text()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;
    config.session_duration = duration
        .trim()
        .parse()
        .map_err(|_| CliError::config("invalid session duration: must be a number"))?;

    config.open_browser = Confirm::with_theme(&theme)
        .with_prompt("Automatically open the browser?")
        .default(false)
        .interact()
        .map_err(|e| CliError::config(format!("prompt failed: {e}")))?;

    let path = config.save_default().await?;
    println!();
    print_success(&format!("Configuration saved to: {}", path.display()));
    Ok(())
}

async fn handle_set(key: &str, value: &str) -> Result<()> {
    let mut config = CliConfig::load_default().await?;
    config.set(key, value)?;
    config.save_default().await?;
    print_success(&format!("Set {key} = {value}"));
    Ok(())
}

async fn handle_get(key: &str) -> Result<()> {
    let config = CliConfig::load_default().await?;
    println!("{}", config.get(key)?);
    Ok(())
}

async fn handle_list() -> Result<()> {
    let config = CliConfig::load_default().await?;
    println!("Current configuration:");
    println!("======================");
    for key in CliConfig::keys() {
        println!("{:<22} {}", format!("{key}:"), config.get(key)?);
    }
    Ok(())
}

fn handle_path() -> Result<()> {
    let path = CliConfig::config_path()?;
    if path.exists() {
        println!("{}", path.display());
    } else {
        println!("{} (not created yet)", path.display());
    }
    Ok(())
}
