use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: i64,
    /// Slash separated path as reported by Canvas, e.g. `course files/week 1`.
    pub full_name: String,
    pub files_count: i64,
    pub parent_id: Option<i64>,
    pub course_id: i64,
    pub updated_at: NaiveDateTime,
    pub saved_at: Option<NaiveDateTime>,
}

impl Folder {
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.full_name.split('/').filter(|s| !s.is_empty())
    }
}
