//! Wayfarer API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wayfarer_common::config::AppConfig;
use wayfarer_common::db::{create_pool, run_migrations};
use wayfarer_notifier::{DispatchJob, ExpoPushClient, PgNotificationQueue, scheduler};

use wayfarer_api::routes::create_router;
use wayfarer_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("wayfarer_api=info,wayfarer_notifier=info,tower_http=info")
        }))
        .json()
        .init();

    tracing::info!("Starting Wayfarer API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;

    // Build the dispatch job
    let queue = Arc::new(PgNotificationQueue::new(pool));
    let gateway = Arc::new(ExpoPushClient::from_config(&config)?);
    let dispatcher = Arc::new(DispatchJob::new(queue, gateway));

    let schedule = config
        .dispatch_interval_secs
        .map(|secs| scheduler::spawn(dispatcher.clone(), Duration::from_secs(secs)));

    let state = AppState::new(dispatcher);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    if let Some(handle) = schedule {
        handle.abort();
    }

    tracing::info!("Wayfarer API server stopped.");
    Ok(())
}
