//! Main entry point for the fedcreds CLI

use clap::Parser;
use color_eyre::eyre::Result;
use fedcreds::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Configure color-eyre with custom settings
    // Disable location display (file paths and line numbers)
    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    // Run and propagate errors as eyre::Report
    Ok(args.run().await?)
}
