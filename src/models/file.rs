use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    pub id: i64,
    pub name: String,
    /// Empty until Canvas hands out a URL carrying a `verifier`.
    pub download_url: String,
    pub module_name: Option<String>,
    pub folder_id: Option<i64>,
    pub course_id: i64,
    pub updated_at: NaiveDateTime,
    pub saved_at: Option<NaiveDateTime>,
}

impl File {
    pub fn has_download_url(&self) -> bool {
        !self.download_url.is_empty()
    }
}
