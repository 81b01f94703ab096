use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::FavoriteCourse;

/// Entry of `GET /api/v1/users/self/favorites/courses`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestCourse {
    pub id: i64,
    #[serde(default)]
    pub course_code: String,
    pub name: String,
}

impl From<RestCourse> for FavoriteCourse {
    fn from(course: RestCourse) -> Self {
        FavoriteCourse {
            id: course.id,
            code: course.course_code,
            name: course.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestFolder {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub files_count: i64,
    pub parent_folder_id: Option<i64>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestFile {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub url: String,
    pub updated_at: String,
}

/// The part of `GET /api/v1/files/{id}` the materializer cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct GraphQLRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AllCoursesData {
    #[serde(rename = "allCourses", default)]
    pub all_courses: Vec<CourseListing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseListing {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub term: Option<Term>,
}

impl CourseListing {
    pub fn course_id(&self) -> Result<i64, AppError> {
        parse_id(&self.id)
    }

    pub fn term_name(&self) -> Option<String> {
        self.term.as_ref().map(|t| t.name.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CourseModulesData {
    pub course: Option<CourseModules>,
}

#[derive(Debug, Deserialize)]
pub struct CourseModules {
    #[serde(rename = "modulesConnection")]
    pub modules_connection: ModulesConnection,
}

#[derive(Debug, Deserialize)]
pub struct ModulesConnection {
    #[serde(default)]
    pub nodes: Vec<Module>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(rename = "moduleItems", default)]
    pub module_items: Vec<ModuleItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleItem {
    pub content: Option<ModuleContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleContent {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub url: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

impl ModuleContent {
    pub fn content_id(&self) -> Result<i64, AppError> {
        let raw = self
            .id
            .as_deref()
            .ok_or_else(|| AppError::Parse("module item content without _id".to_string()))?;
        parse_id(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ContentKind {
    File,
    ExternalUrl,
    #[serde(other)]
    Other,
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::Parse(format!("invalid Canvas id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_items_keep_known_kinds_only() {
        let data: CourseModulesData = serde_json::from_value(serde_json::json!({
            "course": {
                "modulesConnection": {
                    "nodes": [{
                        "name": "Week 1",
                        "moduleItems": [
                            { "content": { "type": "File", "_id": "42", "url": "https://x/files/42?verifier=v", "name": "Slides.pdf", "updatedAt": "2024-01-01T00:00:00Z" } },
                            { "content": { "type": "ExternalUrl", "_id": "7", "url": "https://example.com", "name": "Welcome", "updatedAt": "2024-01-01T00:00:00Z" } },
                            { "content": { "type": "Assignment" } },
                            { "content": null }
                        ]
                    }]
                }
            }
        }))
        .unwrap();

        let module = &data.course.unwrap().modules_connection.nodes[0];
        let kinds: Vec<_> = module
            .module_items
            .iter()
            .map(|item| item.content.as_ref().map(|c| c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ContentKind::File),
                Some(ContentKind::ExternalUrl),
                Some(ContentKind::Other),
                None
            ]
        );
        assert_eq!(module.module_items[0].content.as_ref().unwrap().content_id().unwrap(), 42);
    }

    #[test]
    fn course_listing_tolerates_missing_term() {
        let listing: CourseListing = serde_json::from_value(serde_json::json!({
            "_id": "1", "updatedAt": "2024-01-01T00:00:00Z", "term": null
        }))
        .unwrap();
        assert_eq!(listing.course_id().unwrap(), 1);
        assert_eq!(listing.term_name(), None);
    }

    #[test]
    fn non_numeric_ids_are_parse_errors() {
        let listing = CourseListing {
            id: "abc".to_string(),
            updated_at: String::new(),
            term: None,
        };
        assert!(matches!(listing.course_id(), Err(AppError::Parse(_))));
    }
}
