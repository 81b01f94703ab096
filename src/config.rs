use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Runtime settings loaded from `config.toml` and the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub url: String,
    pub access_token: String,
    pub database_url: String,
    pub sync_root: PathBuf,
    pub poll_interval_secs: u64,
    pub excluded_formats: Vec<String>,
    pub retry: RetrySettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// On-disk shape of `config.toml`; every key is optional so the environment can fill gaps.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    url: Option<String>,
    access_token: Option<String>,
    database_url: Option<String>,
    sync_root: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    excluded_formats: Vec<String>,
    #[serde(default)]
    retry: RetrySettings,
}

impl Config {
    /// Read `config.toml` (or `CANVAS_STREAM_CONFIG`) and apply environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let path = env::var("CANVAS_STREAM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let file = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::parse_file(&raw)?
        } else {
            tracing::debug!("config file {} not found, using environment only", path.display());
            FileConfig::default()
        };
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        Self::resolve(Self::parse_file(raw)?, |_| None)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn parse_file(raw: &str) -> Result<FileConfig, AppError> {
        toml::from_str(raw).map_err(|e| AppError::Config(format!("invalid config file: {}", e)))
    }

    fn resolve(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let url = lookup("CANVAS_URL")
            .or(file.url)
            .ok_or_else(|| AppError::Config("url is not set".to_string()))?;
        let access_token = lookup("CANVAS_ACCESS_TOKEN")
            .or(file.access_token)
            .ok_or_else(|| AppError::Config("access_token is not set".to_string()))?;
        let database_url = lookup("DATABASE_URL")
            .or(file.database_url)
            .unwrap_or_else(|| "sqlite://canvas.db".to_string());
        let sync_root = lookup("CANVAS_SYNC_ROOT")
            .map(PathBuf::from)
            .or(file.sync_root)
            .unwrap_or_else(|| PathBuf::from("canvas"));
        let poll_interval_secs = match lookup("CANVAS_POLL_INTERVAL") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::Config(format!("CANVAS_POLL_INTERVAL is not a number: {}", raw)))?,
            None => file.poll_interval_secs.unwrap_or(20),
        };

        if poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be positive".to_string()));
        }
        if file.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be at least 1".to_string()));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            access_token,
            database_url,
            sync_root,
            poll_interval_secs,
            excluded_formats: file.excluded_formats,
            retry: file.retry,
        })
    }
}
