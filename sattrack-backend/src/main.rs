use sattrack_backend::config;
use sattrack_backend::handler;
use sattrack_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};
use sattrack_backend::module::tle::TleCatalogManager;
use sattrack_backend::service::SatTrackService;

use anyhow::{Context, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config = config::read_config(&config_path)?;

    // Initialize logging
    let _logging_guard = sattrack_backend::logging::init_logging(
        "logs",
        "sattrack-backend",
        &config.log_level,
    )?;

    tracing::info!("SatTrack Backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    // Initialize catalog manager (serves the cached catalog until the first refresh)
    let catalog_manager = TleCatalogManager::new(&config.tle)?;
    catalog_manager.initialize().await?;
    tracing::info!("TLE catalog manager initialized successfully");

    // Configure and start scheduled tasks
    let task_config = ScheduledTaskConfig {
        refresh_interval_minutes: catalog_manager.refresh_interval_minutes(),
        perform_initial_refresh: true,
    };
    let mut task_manager = ScheduledTaskManager::new(task_config, catalog_manager.clone());
    task_manager.start_all();

    let service = SatTrackService::new(catalog_manager, config.prediction.clone());
    let app = handler::router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address()))?;
    tracing::info!("HTTP server listening on {}", config.server_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    task_manager.shutdown().await;
    tracing::info!("SatTrack Backend stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
