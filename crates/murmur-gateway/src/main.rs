//! murmur HTTP/JSON Gateway binary.

use std::sync::Arc;

use clap::Parser;
use murmur_core::DocumentStore;
use murmur_gateway::{create_router, AppState, Args, BroadcastPublisher, GatewayConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        data_path = %config.data_path.display(),
        temporary = config.temporary,
        "Starting murmur gateway"
    );

    if config.max_limit == 0 {
        anyhow::bail!("max_limit must be at least 1");
    }

    let store = DocumentStore::open(config.storage_config())?;
    let publisher = Arc::new(BroadcastPublisher::new(config.notification_capacity));
    let state = AppState::new(store.clone(), config.clone(), publisher)?;
    info!(
        users = state.users.len(),
        notifications = state.notifications.len(),
        "Document store ready"
    );

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush()?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
