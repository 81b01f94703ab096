use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::canvas::CanvasClient;
use crate::config::Config;
use crate::db::repository;
use crate::error::AppError;
use crate::models::FavoriteCourse;
use crate::services::materializer::Materializer;
use crate::services::retry::RetryPolicy;
use crate::services::shutdown::Shutdown;
use crate::services::walker::HierarchyWalker;
use crate::sync::PathResolver;

/// Per-service settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub sync_root: PathBuf,
    pub excluded_formats: Vec<String>,
    pub retry: RetryPolicy,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sync_root: config.sync_root.clone(),
            excluded_formats: config.excluded_formats.clone(),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_root: PathBuf::from("canvas"),
            excluded_formats: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Runs reconciliation iterations against one store and one Canvas client.
pub struct SyncService {
    db: SqlitePool,
    canvas: Arc<dyn CanvasClient>,
    resolver: PathResolver,
    options: SyncOptions,
    shutdown: Shutdown,
}

/// Counters collected over one iteration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub favorites_refreshed: usize,
    pub courses_checked: usize,
    pub courses_walked: usize,
    pub courses_skipped: usize,
    pub folders_listed: usize,
    pub folders_skipped: usize,
    pub folders_failed: usize,
    pub files_recorded: usize,
    pub links_recorded: usize,
    pub files_downloaded: usize,
    pub files_deferred: usize,
    pub files_failed: usize,
    pub files_excluded: usize,
    pub links_written: usize,
}

impl SyncService {
    pub fn new(db: SqlitePool, canvas: Arc<dyn CanvasClient>, options: SyncOptions) -> Self {
        Self {
            db,
            canvas,
            resolver: PathResolver::new(options.sync_root.clone()),
            options,
            shutdown: Shutdown::never(),
        }
    }

    /// Stop at the next entity boundary once `shutdown` is raised.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// One reconciliation iteration: refresh favorites, walk the hierarchy,
    /// then materialize whatever is still unsaved.
    pub async fn sync_all(&self) -> Result<SyncStats, AppError> {
        info!("Running iteration...");
        let mut stats = SyncStats::default();

        stats.favorites_refreshed = self.refresh_favorites().await?;

        let canvas = self.canvas.as_ref();
        let listings = self
            .options
            .retry
            .run("courses listing", move || canvas.all_courses())
            .await?;

        HierarchyWalker::new(&self.db, canvas, &self.options.retry, &self.shutdown)
            .walk(&listings, &mut stats)
            .await?;

        if self.shutdown.is_requested() {
            info!("Shutdown requested, skipping downloads this iteration");
            return Ok(stats);
        }

        Materializer::new(
            &self.db,
            canvas,
            &self.resolver,
            &self.options.retry,
            &self.options.excluded_formats,
            &self.shutdown,
        )
        .run(&mut stats)
        .await?;

        info!("Iteration completed: {:?}", stats);
        Ok(stats)
    }

    /// New favorites enter the system here; known ones get code and name refreshed.
    async fn refresh_favorites(&self) -> Result<usize, AppError> {
        let canvas = self.canvas.as_ref();
        let favorites = self
            .options
            .retry
            .run("favorites listing", move || canvas.favorite_courses())
            .await?;

        let count = favorites.len();
        for course in favorites {
            repository::upsert_favorite_course(&self.db, &FavoriteCourse::from(course)).await?;
        }
        Ok(count)
    }
}
