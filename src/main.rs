//! MCP Registry server binary.

use std::sync::Arc;

use mcp_registry::{open_store, seed, serve, Config, APP_NAME, APP_VERSION};

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .init();

    tracing::info!("{} v{}", APP_NAME, APP_VERSION);
    config.log_config();

    let store = open_store(&config).await?;

    seed(&config, store.as_ref()).await;

    let result = serve(Arc::new(config), store.clone()).await;
    store.close().await;
    result
}
