//! File records: reviewable photos and attached originals.
//!
//! Delete helpers return the deleted rows so callers can unlink the on-disk
//! artifacts after their transaction commits.

use crate::ingest::StoredUpload;
use crate::models::{FileKind, ReviewStatus, StoredFile};
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const FILE_COLUMNS: &str =
    "id, submission_id, file_name, file_path, thumb_path, file_size, is_original, review_status, review_comment, parent_photo_id";

fn file_from_row(row: &SqliteRow) -> StoredFile {
    let is_original: i64 = row.get("is_original");
    let kind = if is_original != 0 {
        FileKind::Original {
            parent_photo_id: row.get("parent_photo_id"),
        }
    } else {
        FileKind::Photo {
            review_status: ReviewStatus::parse(&row.get::<String, _>("review_status"))
                .unwrap_or(ReviewStatus::Pending),
            review_comment: row
                .get::<Option<String>, _>("review_comment")
                .unwrap_or_default(),
            thumb_path: row.get("thumb_path"),
        }
    };

    StoredFile {
        id: row.get("id"),
        submission_id: row.get("submission_id"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        file_size: row.get("file_size"),
        kind,
    }
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<StoredFile>> {
    let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(file_from_row))
}

pub async fn list_for_submission(
    conn: &mut SqliteConnection,
    submission_id: i64,
) -> Result<Vec<StoredFile>> {
    let rows = sqlx::query(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE submission_id = ? ORDER BY id"
    ))
    .bind(submission_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(file_from_row).collect())
}

/// Fetch a set of files by id, for activity-log photo reference resolution.
pub async fn list_by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<StoredFile>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE id IN ("
    ));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    builder.push(")");

    let rows = builder.build().fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(file_from_row).collect())
}

/// Insert a newly stored photo (review status pending).
pub async fn insert_photo(
    conn: &mut SqliteConnection,
    submission_id: i64,
    upload: &StoredUpload,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO files (submission_id, file_name, file_path, thumb_path, file_size, is_original, review_status, review_comment, parent_photo_id)
        VALUES (?, ?, ?, ?, ?, 0, 'pending', '', NULL)
        "#,
    )
    .bind(submission_id)
    .bind(&upload.file_name)
    .bind(&upload.file_path)
    .bind(&upload.thumb_path)
    .bind(upload.file_size)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert a newly stored original, optionally linked to one photo.
pub async fn insert_original(
    conn: &mut SqliteConnection,
    submission_id: i64,
    parent_photo_id: Option<i64>,
    upload: &StoredUpload,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO files (submission_id, file_name, file_path, thumb_path, file_size, is_original, parent_photo_id)
        VALUES (?, ?, ?, NULL, ?, 1, ?)
        "#,
    )
    .bind(submission_id)
    .bind(&upload.file_name)
    .bind(&upload.file_path)
    .bind(upload.file_size)
    .bind(parent_photo_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn set_review(
    conn: &mut SqliteConnection,
    id: i64,
    status: ReviewStatus,
    comment: &str,
) -> Result<()> {
    sqlx::query("UPDATE files SET review_status = ?, review_comment = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(comment)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_review_comment(conn: &mut SqliteConnection, id: i64, comment: &str) -> Result<()> {
    sqlx::query("UPDATE files SET review_comment = ? WHERE id = ?")
        .bind(comment)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete a submission's files, all of them or only the submission-level and
/// photo-linked originals. Returns the deleted rows.
pub async fn delete_submission_files(
    conn: &mut SqliteConnection,
    submission_id: i64,
    originals_only: bool,
) -> Result<Vec<StoredFile>> {
    let filter = if originals_only {
        "submission_id = ? AND is_original = 1"
    } else {
        "submission_id = ?"
    };

    let rows = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE {filter}"))
        .bind(submission_id)
        .fetch_all(&mut *conn)
        .await?;
    let deleted: Vec<StoredFile> = rows.iter().map(file_from_row).collect();

    sqlx::query(&format!("DELETE FROM files WHERE {filter}"))
        .bind(submission_id)
        .execute(&mut *conn)
        .await?;

    Ok(deleted)
}

/// Delete the originals linked to one photo. Returns the deleted rows.
pub async fn delete_photo_originals(
    conn: &mut SqliteConnection,
    photo_id: i64,
) -> Result<Vec<StoredFile>> {
    let rows = sqlx::query(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE parent_photo_id = ? AND is_original = 1"
    ))
    .bind(photo_id)
    .fetch_all(&mut *conn)
    .await?;
    let deleted: Vec<StoredFile> = rows.iter().map(file_from_row).collect();

    sqlx::query("DELETE FROM files WHERE parent_photo_id = ? AND is_original = 1")
        .bind(photo_id)
        .execute(&mut *conn)
        .await?;

    Ok(deleted)
}

pub async fn delete_file(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;
    use std::str::FromStr;

    async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("Failed to parse connect options")
            .foreign_keys(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory database");
        crate::db::init_tables(&pool).await.expect("Failed to initialize schema");
        pool
    }

    fn upload(name: &str) -> StoredUpload {
        StoredUpload {
            file_name: name.to_string(),
            file_size: 300_000,
            file_path: format!("uploads/1_{name}"),
            thumb_path: Some(format!("uploads/thumbs/1_{name}_thumb.jpg")),
        }
    }

    #[tokio::test]
    async fn photo_and_original_round_trip_as_variants() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let photo_id = insert_photo(&mut conn, 1, &upload("a.jpg")).await.unwrap();
        let original_id = insert_original(&mut conn, 1, Some(photo_id), &upload("a.dng"))
            .await
            .unwrap();

        let photo = get(&mut conn, photo_id).await.unwrap().unwrap();
        match &photo.kind {
            FileKind::Photo {
                review_status,
                thumb_path,
                ..
            } => {
                assert_eq!(*review_status, ReviewStatus::Pending);
                assert!(thumb_path.is_some());
            }
            FileKind::Original { .. } => panic!("expected a photo variant"),
        }

        let original = get(&mut conn, original_id).await.unwrap().unwrap();
        assert!(original.is_original());
        assert_eq!(original.parent_photo_id(), Some(photo_id));
    }

    #[tokio::test]
    async fn delete_submission_files_can_spare_photos() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        insert_photo(&mut conn, 1, &upload("a.jpg")).await.unwrap();
        insert_original(&mut conn, 1, None, &upload("a.dng"))
            .await
            .unwrap();

        let deleted = delete_submission_files(&mut conn, 1, true).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].is_original());

        let remaining = list_for_submission(&mut conn, 1).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].is_original());

        let deleted = delete_submission_files(&mut conn, 1, false).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(list_for_submission(&mut conn, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_photo_originals_leaves_submission_originals() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let photo_id = insert_photo(&mut conn, 1, &upload("a.jpg")).await.unwrap();
        insert_original(&mut conn, 1, Some(photo_id), &upload("a.dng"))
            .await
            .unwrap();
        insert_original(&mut conn, 1, None, &upload("b.dng"))
            .await
            .unwrap();

        let deleted = delete_photo_originals(&mut conn, photo_id).await.unwrap();
        assert_eq!(deleted.len(), 1);

        let remaining = list_for_submission(&mut conn, 1).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .any(|f| f.is_original() && f.parent_photo_id().is_none()));
    }
}
