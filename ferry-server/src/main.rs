use anyhow::Context;
use ferry_runner::StandardExecutionService;
use ferry_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ferry_server=info,ferry_runner=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ferry server...");

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        "Scratch root: {}, bundle dir: {}, store: {:?}",
        config.runner.scratch_root.display(),
        config.runner.bundle_dir.display(),
        config.store
    );

    let store = config.store.build().context("Failed to create object store")?;
    let service = Arc::new(StandardExecutionService::new(config.runner, store));

    // Build router with all API endpoints
    let app = api::create_router(service);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
