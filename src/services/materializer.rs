use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::canvas::CanvasClient;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, ExternalUrl, File};
use crate::services::retry::RetryPolicy;
use crate::services::shutdown::Shutdown;
use crate::services::sync_service::SyncStats;
use crate::sync::{PathResolver, is_format_excluded, now, redirect_document, usable_download_url};

/// Outcome of making sure a file has a URL Canvas will actually serve.
#[derive(Debug)]
pub enum UrlResolution {
    Resolved(String),
    /// Canvas still withholds the verifier; try again next iteration.
    Deferred,
    Failed(AppError),
}

/// Second pass of an iteration: turn every unsaved record into an artifact on disk.
pub struct Materializer<'a> {
    db: &'a SqlitePool,
    canvas: &'a dyn CanvasClient,
    resolver: &'a PathResolver,
    retry: &'a RetryPolicy,
    excluded_formats: &'a [String],
    shutdown: &'a Shutdown,
}

impl<'a> Materializer<'a> {
    pub fn new(
        db: &'a SqlitePool,
        canvas: &'a dyn CanvasClient,
        resolver: &'a PathResolver,
        retry: &'a RetryPolicy,
        excluded_formats: &'a [String],
        shutdown: &'a Shutdown,
    ) -> Self {
        Self {
            db,
            canvas,
            resolver,
            retry,
            excluded_formats,
            shutdown,
        }
    }

    /// Download pending files, then write pending link documents.
    pub async fn run(&self, stats: &mut SyncStats) -> Result<(), AppError> {
        self.materialize_files(stats).await?;
        self.materialize_links(stats).await
    }

    pub async fn materialize_files(&self, stats: &mut SyncStats) -> Result<(), AppError> {
        info!("Downloading new files...");

        for mut file in repository::fetch_unsaved_files(self.db).await? {
            if self.shutdown.is_requested() {
                info!("Shutdown requested, stopping downloads");
                break;
            }

            if is_format_excluded(&file.name, self.excluded_formats) {
                debug!("Skipping excluded file {}", file.name);
                stats.files_excluded += 1;
                continue;
            }

            match self.resolve_download_url(&file).await {
                UrlResolution::Resolved(url) => {
                    if url != file.download_url {
                        file.download_url = url;
                        repository::upsert_file(self.db, &file).await?;
                    }
                }
                UrlResolution::Deferred => {
                    debug!("File {} has no usable download url yet", file.id);
                    stats.files_deferred += 1;
                    continue;
                }
                UrlResolution::Failed(e) => {
                    warn!("Request error looking up file {}: {}", file.id, e);
                    stats.files_failed += 1;
                    continue;
                }
            }

            let destination = match self.file_destination(&file).await {
                Ok(path) => path,
                Err(AppError::NotFound(what)) => {
                    warn!("Cannot place file {}: missing {}", file.id, what);
                    stats.files_failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            ensure_parent(&destination).await?;

            let canvas = self.canvas;
            let url = file.download_url.as_str();
            let dest = destination.as_path();
            match self.retry.run("download", move || canvas.download(url, dest)).await {
                Ok(()) => {
                    file.saved_at = Some(now());
                    repository::upsert_file(self.db, &file).await?;
                    info!(" FILE -- {}", destination.display());
                    stats.files_downloaded += 1;
                }
                Err(e) if e.is_remote() => {
                    warn!("Download of file {} failed: {}", file.id, e);
                    if matches!(e, AppError::Api { status: 401 | 403, .. }) {
                        // The verifier expired; look the file up again next time.
                        file.download_url.clear();
                        repository::upsert_file(self.db, &file).await?;
                    }
                    stats.files_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub async fn materialize_links(&self, stats: &mut SyncStats) -> Result<(), AppError> {
        for mut link in repository::fetch_unsaved_external_urls(self.db).await? {
            if self.shutdown.is_requested() {
                break;
            }

            let course = match self.course(link.course_id).await {
                Ok(course) => course,
                Err(AppError::NotFound(what)) => {
                    warn!("Cannot place link {}: missing {}", link.id, what);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let path = self.resolver.external_url_path(&course, &link);
            write_redirect(&path, &link).await?;
            info!(" URL -- {}", path.display());

            link.saved_at = Some(now());
            repository::upsert_external_url(self.db, &link).await?;
            stats.links_written += 1;
        }
        Ok(())
    }

    /// A listing URL with a verifier is used as-is; the sentinel triggers one
    /// single-file lookup.
    pub async fn resolve_download_url(&self, file: &File) -> UrlResolution {
        if file.has_download_url() {
            return UrlResolution::Resolved(file.download_url.clone());
        }

        let canvas = self.canvas;
        let file_id = file.id;
        match self.retry.run("file lookup", move || canvas.file(file_id)).await {
            Ok(info) => {
                let url = usable_download_url(&info.url);
                if url.is_empty() {
                    UrlResolution::Deferred
                } else {
                    UrlResolution::Resolved(url)
                }
            }
            Err(e) => UrlResolution::Failed(e),
        }
    }

    pub async fn file_destination(&self, file: &File) -> Result<PathBuf, AppError> {
        let course = self.course(file.course_id).await?;
        let folder = match file.folder_id {
            Some(id) => Some(
                repository::find_folder_by_id(self.db, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("folder {}", id)))?,
            ),
            None => None,
        };
        Ok(self.resolver.file_path(&course, folder.as_ref(), file))
    }

    async fn course(&self, id: i64) -> Result<Course, AppError> {
        repository::find_course_by_id(self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))
    }
}

async fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn write_redirect(path: &Path, link: &ExternalUrl) -> Result<(), AppError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, redirect_document(&link.url)).await?;
    Ok(())
}
