//! Plant Relay - Main Entry Point

use anyhow::Context;
use plant_api::config::{ServerConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use plant_api::{init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = ServerConfig::load(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    init_logging(&config.logging)?;

    info!("=== Plant Relay v{} ===", env!("CARGO_PKG_VERSION"));
    info!(config = %config_path, database = %config.database.url, "Configuration loaded");

    run_server(&config).await
}
