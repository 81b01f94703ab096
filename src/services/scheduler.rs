use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::canvas::CanvasClient;
use crate::error::AppError;
use crate::services::shutdown::Shutdown;
use crate::services::sync_service::{SyncOptions, SyncService, SyncStats};

/// Runs a reconciliation iteration, sleeps, and repeats until shut down.
pub struct SyncScheduler {
    service: SyncService,
    interval: Duration,
    shutdown: Shutdown,
}

impl SyncScheduler {
    pub fn new(
        db: SqlitePool,
        canvas: Arc<dyn CanvasClient>,
        options: SyncOptions,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            service: SyncService::new(db, canvas, options).with_shutdown(shutdown.clone()),
            interval,
            shutdown,
        }
    }

    /// A single iteration, without sleeping.
    pub async fn run_once(&self) -> Result<SyncStats, AppError> {
        self.service.sync_all().await
    }

    /// Loop until shutdown; a failed iteration is logged and the next one still runs.
    pub async fn start(mut self) {
        info!("Starting sync scheduler (interval: {:?})", self.interval);

        loop {
            match self.run_once().await {
                Ok(stats) => {
                    info!(
                        "Sync completed - walked {} courses, downloaded {} files, wrote {} links, deferred {}",
                        stats.courses_walked,
                        stats.files_downloaded,
                        stats.links_written,
                        stats.files_deferred
                    );
                }
                Err(e) => {
                    // the next iteration starts again from persisted state
                    warn!("Sync iteration failed: {}", e);
                }
            }

            if self.shutdown.is_requested() {
                break;
            }

            info!("Waiting {} seconds before next iteration", self.interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.wait() => break,
            }
        }

        info!("Sync scheduler stopped");
    }
}
