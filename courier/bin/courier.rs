//! Courier delivery engine server.

use std::sync::Arc;

use courier::{config, engine::Engine};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = config::find_config_file()?;
    tracing::info!("Loading configuration from {}", config_path.display());
    let config = config::Config::load(&config_path)?;

    let engine = Arc::new(Engine::from_config(config)?);
    engine.load_fixtures().await?;
    engine.run().await
}
