use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::models::{Course, ExternalUrl, FavoriteCourse, File, Folder};

pub async fn find_course_by_id(db: &SqlitePool, id: i64) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, code, name, is_favorite, term, updated_at, saved_at FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Insert a newly favorited course or refresh code/name of a known one,
/// leaving term, timestamps and the saved marker untouched.
pub async fn upsert_favorite_course(
    db: &SqlitePool,
    course: &FavoriteCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO courses (id, code, name, is_favorite)
        VALUES (?1, ?2, ?3, 1)
        ON CONFLICT(id) DO UPDATE SET
            code = excluded.code,
            name = excluded.name,
            is_favorite = 1
        "#,
    )
    .bind(course.id)
    .bind(&course.code)
    .bind(&course.name)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn upsert_course(db: &SqlitePool, course: &Course) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO courses (id, code, name, is_favorite, term, updated_at, saved_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            code = excluded.code,
            name = excluded.name,
            is_favorite = excluded.is_favorite,
            term = excluded.term,
            updated_at = excluded.updated_at,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(course.id)
    .bind(&course.code)
    .bind(&course.name)
    .bind(course.is_favorite)
    .bind(&course.term)
    .bind(course.updated_at)
    .bind(course.saved_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_folder_by_id(db: &SqlitePool, id: i64) -> Result<Option<Folder>, sqlx::Error> {
    sqlx::query_as::<_, Folder>(
        "SELECT id, full_name, files_count, parent_id, course_id, updated_at, saved_at FROM folders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn upsert_folder(db: &SqlitePool, folder: &Folder) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO folders (id, full_name, files_count, parent_id, course_id, updated_at, saved_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            full_name = excluded.full_name,
            files_count = excluded.files_count,
            parent_id = excluded.parent_id,
            course_id = excluded.course_id,
            updated_at = excluded.updated_at,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(folder.id)
    .bind(&folder.full_name)
    .bind(folder.files_count)
    .bind(folder.parent_id)
    .bind(folder.course_id)
    .bind(folder.updated_at)
    .bind(folder.saved_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn mark_folder_saved(
    db: &SqlitePool,
    id: i64,
    saved_at: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE folders SET saved_at = ? WHERE id = ?")
        .bind(saved_at)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn find_file_by_id(db: &SqlitePool, id: i64) -> Result<Option<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT id, name, download_url, module_name, folder_id, course_id, updated_at, saved_at FROM files WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_unsaved_files(db: &SqlitePool) -> Result<Vec<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT id, name, download_url, module_name, folder_id, course_id, updated_at, saved_at FROM files WHERE saved_at IS NULL ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn upsert_file(db: &SqlitePool, file: &File) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO files (id, name, download_url, module_name, folder_id, course_id, updated_at, saved_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            download_url = excluded.download_url,
            module_name = excluded.module_name,
            folder_id = excluded.folder_id,
            course_id = excluded.course_id,
            updated_at = excluded.updated_at,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(file.id)
    .bind(&file.name)
    .bind(&file.download_url)
    .bind(&file.module_name)
    .bind(file.folder_id)
    .bind(file.course_id)
    .bind(file.updated_at)
    .bind(file.saved_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_external_url_by_id(
    db: &SqlitePool,
    id: i64,
) -> Result<Option<ExternalUrl>, sqlx::Error> {
    sqlx::query_as::<_, ExternalUrl>(
        "SELECT id, url, title, module_name, course_id, updated_at, saved_at FROM external_urls WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_unsaved_external_urls(db: &SqlitePool) -> Result<Vec<ExternalUrl>, sqlx::Error> {
    sqlx::query_as::<_, ExternalUrl>(
        "SELECT id, url, title, module_name, course_id, updated_at, saved_at FROM external_urls WHERE saved_at IS NULL ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn upsert_external_url(db: &SqlitePool, link: &ExternalUrl) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO external_urls (id, url, title, module_name, course_id, updated_at, saved_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            url = excluded.url,
            title = excluded.title,
            module_name = excluded.module_name,
            course_id = excluded.course_id,
            updated_at = excluded.updated_at,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(link.id)
    .bind(&link.url)
    .bind(&link.title)
    .bind(&link.module_name)
    .bind(link.course_id)
    .bind(link.updated_at)
    .bind(link.saved_at)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;
    use crate::sync::naive_timestamp;

    async fn pool() -> SqlitePool {
        connect("sqlite::memory:").await.expect("Failed to create database")
    }

    #[tokio::test]
    async fn favorite_refresh_keeps_sync_state() {
        let db = pool().await;
        let favorite = FavoriteCourse {
            id: 1,
            code: "INTRO".to_string(),
            name: "Intro 101".to_string(),
        };
        upsert_favorite_course(&db, &favorite).await.unwrap();

        let mut course = find_course_by_id(&db, 1).await.unwrap().unwrap();
        assert!(course.is_favorite);
        assert!(course.saved_at.is_none());

        course.term = Some("Fall".to_string());
        course.updated_at = Some(naive_timestamp("2024-01-01T00:00:00Z").unwrap());
        course.saved_at = Some(naive_timestamp("2024-01-02T00:00:00Z").unwrap());
        upsert_course(&db, &course).await.unwrap();

        let renamed = FavoriteCourse {
            name: "Intro to Everything".to_string(),
            ..favorite
        };
        upsert_favorite_course(&db, &renamed).await.unwrap();

        let stored = find_course_by_id(&db, 1).await.unwrap().unwrap();
        assert_eq!(stored.name, "Intro to Everything");
        assert_eq!(stored.term.as_deref(), Some("Fall"));
        assert_eq!(stored.saved_at, course.saved_at);
    }

    #[tokio::test]
    async fn unsaved_scan_only_returns_files_without_marker() {
        let db = pool().await;
        upsert_favorite_course(
            &db,
            &FavoriteCourse {
                id: 1,
                code: "C".to_string(),
                name: "C".to_string(),
            },
        )
        .await
        .unwrap();

        let updated_at = naive_timestamp("2024-01-01T00:00:00Z").unwrap();
        for (id, saved_at) in [(10, None), (11, Some(updated_at))] {
            upsert_file(
                &db,
                &File {
                    id,
                    name: format!("{}.pdf", id),
                    download_url: String::new(),
                    module_name: None,
                    folder_id: None,
                    course_id: 1,
                    updated_at,
                    saved_at,
                },
            )
            .await
            .unwrap();
        }

        let unsaved = fetch_unsaved_files(&db).await.unwrap();
        assert_eq!(unsaved.len(), 1);
        assert_eq!(unsaved[0].id, 10);
    }
}
