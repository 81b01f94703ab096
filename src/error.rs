use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Canvas API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse Canvas response: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Errors worth retrying: transport failures, rate limiting and server-side faults.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Request(_) => true,
            AppError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Errors raised at the Canvas boundary rather than by local storage.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::Request(_) | AppError::Api { .. } | AppError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Parse(e.to_string())
        } else {
            AppError::Request(e.to_string())
        }
    }
}
