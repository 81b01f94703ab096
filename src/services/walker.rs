use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::canvas::CanvasClient;
use crate::canvas::dto::{ContentKind, CourseListing, ModuleContent, RestFile, RestFolder};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, ExternalUrl, File, Folder};
use crate::services::retry::RetryPolicy;
use crate::services::shutdown::Shutdown;
use crate::services::sync_service::SyncStats;
use crate::sync::{carry_saved_at, is_stale, naive_timestamp, now, usable_download_url};

/// First pass of an iteration: mirror the remote hierarchy of every tracked
/// course into local records.
pub struct HierarchyWalker<'a> {
    db: &'a SqlitePool,
    canvas: &'a dyn CanvasClient,
    retry: &'a RetryPolicy,
    shutdown: &'a Shutdown,
}

/// Whether every listing needed for a course succeeded in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Complete,
    Incomplete,
}

impl<'a> HierarchyWalker<'a> {
    pub fn new(
        db: &'a SqlitePool,
        canvas: &'a dyn CanvasClient,
        retry: &'a RetryPolicy,
        shutdown: &'a Shutdown,
    ) -> Self {
        Self {
            db,
            canvas,
            retry,
            shutdown,
        }
    }

    /// Walk every listed course in order, stopping early on shutdown.
    pub async fn walk(&self, listings: &[CourseListing], stats: &mut SyncStats) -> Result<(), AppError> {
        for listing in listings {
            if self.shutdown.is_requested() {
                info!("Shutdown requested, stopping hierarchy walk");
                break;
            }
            self.walk_course(listing, stats).await?;
        }
        Ok(())
    }

    /// Refresh one course and, when stale, record its modules and folders.
    pub async fn walk_course(&self, listing: &CourseListing, stats: &mut SyncStats) -> Result<(), AppError> {
        let course_id = match listing.course_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping course listing {}: {}", listing.id, e);
                return Ok(());
            }
        };

        // Not favorited: never tracked.
        let Some(mut course) = repository::find_course_by_id(self.db, course_id).await? else {
            return Ok(());
        };
        stats.courses_checked += 1;

        let updated_at = match naive_timestamp(&listing.updated_at) {
            Ok(ts) => ts,
            Err(e) => {
                warn!("Skipping course {}: {}", course.name, e);
                return Ok(());
            }
        };
        course.updated_at = Some(updated_at);
        course.term = listing.term_name();
        repository::upsert_course(self.db, &course).await?;

        if !is_stale(course.saved_at, updated_at) {
            debug!("Course {} is up to date", course.name);
            stats.courses_skipped += 1;
            return Ok(());
        }

        info!("Updating references of {}", course.name);
        stats.courses_walked += 1;
        let started = now();

        let modules = self.record_module_items(&course, stats).await?;
        let folders = self.record_folders(&course, stats).await?;

        if modules == Pass::Complete && folders == Pass::Complete {
            course.saved_at = Some(course.saved_at.map_or(started, |prev| prev.max(started)));
            repository::upsert_course(self.db, &course).await?;
        } else {
            warn!(
                "Course {} left stale after incomplete pass, it will be walked again",
                course.name
            );
        }
        Ok(())
    }

    async fn record_module_items(&self, course: &Course, stats: &mut SyncStats) -> Result<Pass, AppError> {
        let canvas = self.canvas;
        let course_id = course.id;
        let modules = match self
            .retry
            .run("modules listing", move || canvas.modules_with_items(course_id))
            .await
        {
            Ok(modules) => modules,
            Err(e) if e.is_remote() => {
                warn!("Request error with modules of {}: {}", course.name, e);
                return Ok(Pass::Incomplete);
            }
            Err(e) => return Err(e),
        };

        for module in &modules {
            for content in module.module_items.iter().filter_map(|item| item.content.as_ref()) {
                let recorded = match content.kind {
                    ContentKind::File => self.record_module_file(course, &module.name, content).await,
                    ContentKind::ExternalUrl => self.record_external_url(course, &module.name, content).await,
                    ContentKind::Other => continue,
                };
                match recorded {
                    Ok(()) => match content.kind {
                        ContentKind::File => stats.files_recorded += 1,
                        _ => stats.links_recorded += 1,
                    },
                    Err(e) if e.is_remote() => {
                        warn!("Skipping malformed item in module {}: {}", module.name, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Pass::Complete)
    }

    async fn record_module_file(
        &self,
        course: &Course,
        module_name: &str,
        content: &ModuleContent,
    ) -> Result<(), AppError> {
        let id = content.content_id()?;
        let updated_at = naive_timestamp(content.updated_at.as_deref().unwrap_or_default())?;
        let previous = repository::find_file_by_id(self.db, id).await?;

        let file = File {
            id,
            name: content.name.clone().unwrap_or_default(),
            download_url: usable_download_url(content.url.as_deref().unwrap_or_default()),
            module_name: Some(module_name.to_string()),
            folder_id: previous.as_ref().and_then(|f| f.folder_id),
            course_id: course.id,
            updated_at,
            saved_at: carry_saved_at(previous.and_then(|f| f.saved_at), updated_at),
        };
        repository::upsert_file(self.db, &file).await?;
        Ok(())
    }

    async fn record_external_url(
        &self,
        course: &Course,
        module_name: &str,
        content: &ModuleContent,
    ) -> Result<(), AppError> {
        let id = content.content_id()?;
        let updated_at = naive_timestamp(content.updated_at.as_deref().unwrap_or_default())?;
        let previous = repository::find_external_url_by_id(self.db, id).await?;

        let link = ExternalUrl {
            id,
            url: content.url.clone().unwrap_or_default(),
            title: content.name.clone().unwrap_or_default(),
            module_name: module_name.to_string(),
            course_id: course.id,
            updated_at,
            saved_at: carry_saved_at(previous.and_then(|l| l.saved_at), updated_at),
        };
        repository::upsert_external_url(self.db, &link).await?;
        Ok(())
    }

    async fn record_folders(&self, course: &Course, stats: &mut SyncStats) -> Result<Pass, AppError> {
        let canvas = self.canvas;
        let course_id = course.id;
        let listing = match self
            .retry
            .run("folders listing", move || canvas.folders(course_id))
            .await
        {
            Ok(folders) => folders,
            Err(e) if e.is_remote() => {
                warn!("Request error with folders of {}: {}", course.name, e);
                return Ok(Pass::Incomplete);
            }
            Err(e) => return Err(e),
        };

        let mut pass = Pass::Complete;
        for info in &listing {
            if self.shutdown.is_requested() {
                return Ok(Pass::Incomplete);
            }

            let folder = match self.record_folder(course, info).await {
                Ok(folder) => folder,
                Err(e) if e.is_remote() => {
                    warn!("Skipping malformed folder {}: {}", info.id, e);
                    stats.folders_failed += 1;
                    pass = Pass::Incomplete;
                    continue;
                }
                Err(e) => return Err(e),
            };

            // Listing files costs a request; skip when there is nothing new to see.
            if folder.files_count == 0 || !is_stale(folder.saved_at, folder.updated_at) {
                stats.folders_skipped += 1;
                continue;
            }

            let started = now();
            let folder_id = folder.id;
            match self
                .retry
                .run("folder files listing", move || canvas.files_in_folder(folder_id))
                .await
            {
                Ok(files) => {
                    for entry in &files {
                        match self.record_folder_file(course, &folder, entry).await {
                            Ok(()) => stats.files_recorded += 1,
                            Err(e) if e.is_remote() => {
                                warn!("Skipping malformed file {}: {}", entry.id, e);
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    repository::mark_folder_saved(self.db, folder.id, started).await?;
                    stats.folders_listed += 1;
                }
                Err(e) if e.is_remote() => {
                    warn!("Request error with folder {} ({}): {}", folder.id, course.name, e);
                    stats.folders_failed += 1;
                    pass = Pass::Incomplete;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(pass)
    }

    async fn record_folder(&self, course: &Course, info: &RestFolder) -> Result<Folder, AppError> {
        let updated_at = naive_timestamp(&info.updated_at)?;
        let previous = repository::find_folder_by_id(self.db, info.id).await?;

        let folder = Folder {
            id: info.id,
            full_name: info.full_name.clone(),
            files_count: info.files_count,
            parent_id: info.parent_folder_id,
            course_id: course.id,
            updated_at,
            saved_at: carry_saved_at(previous.and_then(|f| f.saved_at), updated_at),
        };
        repository::upsert_folder(self.db, &folder).await?;
        Ok(folder)
    }

    async fn record_folder_file(&self, course: &Course, folder: &Folder, entry: &RestFile) -> Result<(), AppError> {
        let updated_at = naive_timestamp(&entry.updated_at)?;
        let previous = repository::find_file_by_id(self.db, entry.id).await?;

        let file = File {
            id: entry.id,
            name: entry.filename.clone(),
            download_url: usable_download_url(&entry.url),
            module_name: previous.as_ref().and_then(|f| f.module_name.clone()),
            folder_id: Some(folder.id),
            course_id: course.id,
            updated_at,
            saved_at: carry_saved_at(previous.and_then(|f| f.saved_at), updated_at),
        };
        repository::upsert_file(self.db, &file).await?;
        Ok(())
    }
}
