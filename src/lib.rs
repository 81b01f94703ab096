pub mod canvas;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;

use std::sync::Arc;

use tracing::info;

use crate::canvas::CanvasHttpClient;
use crate::config::Config;
use crate::error::AppError;
use crate::services::{Shutdown, SyncOptions, SyncScheduler};

/// Mirror the configured Canvas account until `shutdown` is raised.
pub async fn run(config: Config, shutdown: Shutdown) -> Result<(), AppError> {
    let pool = db::connect(&config.database_url).await?;
    info!("database ready at {}", config.database_url);

    let canvas = Arc::new(CanvasHttpClient::new(&config.url, &config.access_token)?);
    let scheduler = SyncScheduler::new(
        pool,
        canvas,
        SyncOptions::from_config(&config),
        config.poll_interval(),
        shutdown,
    );
    scheduler.start().await;

    Ok(())
}
