pub mod dto;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::AppError;

const PER_PAGE: &str = "100";

const ALL_COURSES_QUERY: &str = r#"
query AllCourses {
  allCourses {
    _id
    updatedAt
    term { name }
  }
}
"#;

const MODULES_WITH_ITEMS_QUERY: &str = r#"
query ModulesWithItems($courseId: ID!) {
  course(id: $courseId) {
    modulesConnection {
      nodes {
        name
        moduleItems {
          content {
            type: __typename
            ... on File { _id url name: displayName updatedAt }
            ... on ExternalUrl { _id url name: title updatedAt }
          }
        }
      }
    }
  }
}
"#;

/// The remote side of the mirror: listings, single-file lookups and downloads.
#[async_trait]
pub trait CanvasClient: Send + Sync {
    async fn favorite_courses(&self) -> Result<Vec<dto::RestCourse>, AppError>;
    async fn all_courses(&self) -> Result<Vec<dto::CourseListing>, AppError>;
    async fn modules_with_items(&self, course_id: i64) -> Result<Vec<dto::Module>, AppError>;
    async fn folders(&self, course_id: i64) -> Result<Vec<dto::RestFolder>, AppError>;
    async fn files_in_folder(&self, folder_id: i64) -> Result<Vec<dto::RestFile>, AppError>;
    async fn file(&self, file_id: i64) -> Result<dto::FileInfo, AppError>;
    /// Write the body behind `url` to `destination`; parent directories must exist.
    async fn download(&self, url: &str, destination: &Path) -> Result<(), AppError>;
}

/// REST and GraphQL client for one Canvas instance, authenticated with a bearer token.
pub struct CanvasHttpClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl CanvasHttpClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| AppError::Config(format!("invalid Canvas url {}: {}", raw, e)))
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Fetch every page of a REST listing by following `Link: <...>; rel="next"`.
    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);

        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        while let Some(page_url) = next.take() {
            let response = self
                .client
                .get(&page_url)
                .header(header::AUTHORIZATION, self.authorization())
                .send()
                .await?;
            let response = check_status(response).await?;
            next = next_page_link(response.headers());

            let body = response.text().await?;
            let page: Vec<T> = parse_body(&body)?;
            items.extend(page);
        }
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        parse_body(&body)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AppError> {
        let url = self.endpoint("/api/graphql")?;
        let request_body = dto::GraphQLRequest { query, variables };

        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.authorization())
            .json(&request_body)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let parsed: dto::GraphQLResponse<T> = parse_body(&body)?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(AppError::Parse(format!("GraphQL errors: {}", messages.join("; "))));
        }
        parsed
            .data
            .ok_or_else(|| AppError::Parse("GraphQL response without data".to_string()))
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<(), AppError> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let mut response = check_status(response).await?;

        let mut file = tokio::fs::File::create(partial).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CanvasClient for CanvasHttpClient {
    async fn favorite_courses(&self) -> Result<Vec<dto::RestCourse>, AppError> {
        self.get_paginated("/api/v1/users/self/favorites/courses").await
    }

    async fn all_courses(&self) -> Result<Vec<dto::CourseListing>, AppError> {
        let data: dto::AllCoursesData = self
            .graphql(ALL_COURSES_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.all_courses)
    }

    async fn modules_with_items(&self, course_id: i64) -> Result<Vec<dto::Module>, AppError> {
        let data: dto::CourseModulesData = self
            .graphql(
                MODULES_WITH_ITEMS_QUERY,
                serde_json::json!({ "courseId": course_id.to_string() }),
            )
            .await?;
        Ok(data
            .course
            .map(|course| course.modules_connection.nodes)
            .unwrap_or_default())
    }

    async fn folders(&self, course_id: i64) -> Result<Vec<dto::RestFolder>, AppError> {
        self.get_paginated(&format!("/api/v1/courses/{}/folders", course_id))
            .await
    }

    async fn files_in_folder(&self, folder_id: i64) -> Result<Vec<dto::RestFile>, AppError> {
        self.get_paginated(&format!("/api/v1/folders/{}/files", folder_id))
            .await
    }

    async fn file(&self, file_id: i64) -> Result<dto::FileInfo, AppError> {
        self.get_json(&format!("/api/v1/files/{}", file_id)).await
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<(), AppError> {
        let partial = partial_path(destination);
        if let Err(e) = self.stream_to(url, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, destination).await?;
        Ok(())
    }
}

/// A client that sees an empty Canvas account.
pub struct NoopCanvasClient;

#[async_trait]
impl CanvasClient for NoopCanvasClient {
    async fn favorite_courses(&self) -> Result<Vec<dto::RestCourse>, AppError> {
        Ok(Vec::new())
    }

    async fn all_courses(&self) -> Result<Vec<dto::CourseListing>, AppError> {
        Ok(Vec::new())
    }

    async fn modules_with_items(&self, _course_id: i64) -> Result<Vec<dto::Module>, AppError> {
        Ok(Vec::new())
    }

    async fn folders(&self, _course_id: i64) -> Result<Vec<dto::RestFolder>, AppError> {
        Ok(Vec::new())
    }

    async fn files_in_folder(&self, _folder_id: i64) -> Result<Vec<dto::RestFile>, AppError> {
        Ok(Vec::new())
    }

    async fn file(&self, file_id: i64) -> Result<dto::FileInfo, AppError> {
        Err(AppError::NotFound(format!("file {}", file_id)))
    }

    async fn download(&self, url: &str, _destination: &Path) -> Result<(), AppError> {
        Err(AppError::NotFound(url.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Api {
        status: status.as_u16(),
        body,
    })
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse: {}", e);
        AppError::Parse(e.to_string())
    })
}

fn next_page_link(headers: &header::HeaderMap) -> Option<String> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn next_link_is_extracted_from_link_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LINK,
            HeaderValue::from_static(
                r#"<https://c.test/api/v1/x?page=1&per_page=100>; rel="current",<https://c.test/api/v1/x?page=2&per_page=100>; rel="next",<https://c.test/api/v1/x?page=5&per_page=100>; rel="last""#,
            ),
        );
        assert_eq!(
            next_page_link(&headers).as_deref(),
            Some("https://c.test/api/v1/x?page=2&per_page=100")
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LINK,
            HeaderValue::from_static(r#"<https://c.test/api/v1/x?page=1>; rel="first""#),
        );
        assert_eq!(next_page_link(&headers), None);
        assert_eq!(next_page_link(&HeaderMap::new()), None);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("canvas/intro/notes.pdf")),
            PathBuf::from("canvas/intro/notes.pdf.part")
        );
    }
}
