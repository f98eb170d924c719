//! schooldesk TUI binary entry point

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use schooldesk::{config::Config, tui};

#[derive(Parser)]
#[command(name = "schooldesk-tui")]
#[command(about = "Terminal dashboard for the school management API")]
#[command(version)]
struct Cli {
    /// Override SCHOOLDESK_API_URL
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "schooldesk_tui=info,schooldesk=info");
    }

    // Initialize logging to file for TUI mode to avoid interfering with display
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("schooldesk_tui.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting schooldesk TUI...");

    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    config.validate()?;

    if let Err(e) = tui::run(config).await {
        error!("schooldesk TUI encountered an error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
