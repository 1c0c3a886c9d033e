//! QR Share CLI - Command-line interface
//!
//! Creates share links for text and videos and opens existing links.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use qrshare_core::QrShareConfig;
use qrshare_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "qrshare")]
#[command(about = "Share text and videos through scannable links")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory holding the local content store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Page that share links point at
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Keep shares in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = QrShareConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(base_url) = cli.base_url {
        config.share.base_url = base_url;
    }

    let logs_dir = config.storage.data_dir.join("logs");
    init_tracing(cli.log_level.as_tracing_level(), Some(&logs_dir))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    if let Err(e) = commands::handle_command(cli.command, &config, cli.ephemeral).await {
        tracing::debug!("Command failed: {e}");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}
