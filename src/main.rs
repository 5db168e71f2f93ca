use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adpulse::ads::SystemClock;
use adpulse::api;
use adpulse::config::{Config, StoreBackend};
use adpulse::storage::{EventStore, MemoryEventStore, SqliteEventStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize event store
    let store: Arc<dyn EventStore> = match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory event store");
            Arc::new(MemoryEventStore::new())
        }
        StoreBackend::Sqlite => {
            info!("Using SQLite event store: {}", config.store.url);
            Arc::new(SqliteEventStore::new(&config.store.url, config.store.max_connections).await?)
        }
    };

    info!("Initializing event store...");
    store.init().await?;
    info!("Event store initialized successfully");

    let router = api::create_api_router(Arc::clone(&store), Arc::new(SystemClock));

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Analytics server listening on http://{}", addr);
    info!("   - Ingestion: POST http://{}/api/analytics", addr);
    info!("   - Summary:   GET  http://{}/api/analytics", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
