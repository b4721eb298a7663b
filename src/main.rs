//! Railgun MCP Server - Entry point

use anyhow::Result;
use clap::Parser;
use rmcp::service::ServiceExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use railgun_mcp::{client::ApiClient, config::Settings, RailgunMcpHandler};

/// Railgun MCP Server - Model Context Protocol server for private DeFi on Railgun
#[derive(Parser, Debug)]
#[command(name = "railgun-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: ~/.railgun/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load(cli.config);
    log_config_status(&settings);

    let client = Arc::new(ApiClient::from_settings(&settings));
    if let Err(e) = client.open() {
        warn!(error = %e, "Railgun API client not opened; tool calls will fail until configured");
    }

    let handler = RailgunMcpHandler::new(client.clone(), settings);

    // Serve using stdio transport
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let service = handler.serve((stdin, stdout)).await?;
    info!("Railgun MCP server running on stdio");

    let outcome = tokio::select! {
        result = service.waiting() => {
            info!("MCP session ended");
            result.map(|_| ())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down Railgun MCP server...");
            Ok(())
        }
    };

    client.close();
    outcome?;
    Ok(())
}

fn log_config_status(settings: &Settings) {
    if settings.credential().is_none() {
        warn!("RAILGUN_API_KEY is not set");
    }
    if settings.wallet_password.is_none() {
        warn!("RAILGUN_WALLET_PASSWORD is not set; wallet tools will require a password parameter");
    }
    info!(
        api_url = %settings.railgun_api_url,
        networks = settings.rpc_endpoints.len(),
        "Configuration loaded"
    );
}
