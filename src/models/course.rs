use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_favorite: bool,
    pub term: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub saved_at: Option<NaiveDateTime>,
}

/// Fields refreshed from the favorites listing; everything else on the row is left alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteCourse {
    pub id: i64,
    pub code: String,
    pub name: String,
}
