use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExternalUrl {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub module_name: String,
    pub course_id: i64,
    pub updated_at: NaiveDateTime,
    pub saved_at: Option<NaiveDateTime>,
}
