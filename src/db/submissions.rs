//! Submission persistence and status recomputation.

use crate::models::{aggregate_status, ReviewStatus, Submission, SubmissionStatus};
use crate::time;
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

fn submission_from_row(row: &SqliteRow) -> Submission {
    Submission {
        id: row.get("id"),
        name: row.get("name"),
        district: row.get("district"),
        email: row.get("email"),
        phone: row.get::<Option<String>, _>("phone").unwrap_or_default(),
        comment: row.get::<Option<String>, _>("comment").unwrap_or_default(),
        status: SubmissionStatus::parse(&row.get::<String, _>("status"))
            .unwrap_or(SubmissionStatus::Pending),
        admin_comment: row
            .get::<Option<String>, _>("admin_comment")
            .unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get::<Option<String>, _>("updated_at").unwrap_or_default(),
    }
}

pub async fn get_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<Submission>> {
    let row = sqlx::query("SELECT * FROM submissions WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(submission_from_row))
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Submission>> {
    let row = sqlx::query("SELECT * FROM submissions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(submission_from_row))
}

pub async fn list_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Vec<Submission>> {
    let rows = sqlx::query("SELECT * FROM submissions WHERE email = ? ORDER BY id DESC")
        .bind(email.trim().to_lowercase())
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(submission_from_row).collect())
}

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Submission>> {
    let rows = sqlx::query("SELECT * FROM submissions ORDER BY id DESC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(submission_from_row).collect())
}

/// Insert a fresh submission (status pending, empty admin comment).
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    district: &str,
    email: &str,
    phone: &str,
    comment: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO submissions (name, district, email, phone, comment, status, admin_comment, created_at)
        VALUES (?, ?, ?, ?, ?, 'pending', '', ?)
        "#,
    )
    .bind(name)
    .bind(district)
    .bind(email.trim().to_lowercase())
    .bind(phone)
    .bind(comment)
    .bind(time::now_display())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Overwrite profile fields and reset status to pending with an empty admin
/// comment, as the first step of a resubmission under an existing email.
pub async fn reset_for_resubmission(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    district: &str,
    phone: &str,
    comment: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET name = ?, district = ?, phone = ?, comment = ?, status = 'pending',
            admin_comment = '', updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(district)
    .bind(phone)
    .bind(comment)
    .bind(time::now_display())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update profile fields without touching files or status.
pub async fn update_profile(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    district: &str,
    phone: &str,
    comment: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE submissions
        SET name = ?, district = ?, phone = ?, comment = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(district)
    .bind(phone)
    .bind(comment)
    .bind(time::now_display())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Direct status set. Bypasses recomputation; the next recompute may
/// overwrite it unless photo statuses happen to agree.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: SubmissionStatus,
) -> Result<()> {
    sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(time::now_display())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_admin_comment(conn: &mut SqliteConnection, id: i64, comment: &str) -> Result<()> {
    sqlx::query("UPDATE submissions SET admin_comment = ?, updated_at = ? WHERE id = ?")
        .bind(comment)
        .bind(time::now_display())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Bump updated_at without changing anything else.
pub async fn touch(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("UPDATE submissions SET updated_at = ? WHERE id = ?")
        .bind(time::now_display())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Re-derive a submission's status from its non-original photos' review
/// statuses and write it back, updating updated_at even when the status is
/// unchanged. Runs inside the caller's transaction.
pub async fn recompute_status(
    conn: &mut SqliteConnection,
    submission_id: i64,
) -> Result<SubmissionStatus> {
    let rows = sqlx::query(
        "SELECT review_status FROM files WHERE submission_id = ? AND is_original = 0",
    )
    .bind(submission_id)
    .fetch_all(&mut *conn)
    .await?;

    let statuses: Vec<ReviewStatus> = rows
        .iter()
        .map(|row| {
            ReviewStatus::parse(&row.get::<String, _>("review_status"))
                .unwrap_or(ReviewStatus::Pending)
        })
        .collect();

    let status = aggregate_status(&statuses);

    sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(time::now_display())
        .bind(submission_id)
        .execute(&mut *conn)
        .await?;

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::init_tables(&pool).await.expect("Failed to initialize schema");
        pool
    }

    async fn insert_photo_row(
        conn: &mut SqliteConnection,
        submission_id: i64,
        status: &str,
    ) -> i64 {
        let result = sqlx::query(
            r#"
            INSERT INTO files (submission_id, file_name, file_path, file_size, is_original, review_status, review_comment)
            VALUES (?, 'photo.jpg', 'uploads/photo.jpg', 300000, 0, ?, '')
            "#,
        )
        .bind(submission_id)
        .bind(status)
        .execute(&mut *conn)
        .await
        .expect("Failed to insert photo row");
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn recompute_follows_photo_statuses() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, "Anna", "North", "anna@example.com", "", "")
            .await
            .unwrap();

        let a = insert_photo_row(&mut conn, id, "pending").await;
        let b = insert_photo_row(&mut conn, id, "pending").await;
        let c = insert_photo_row(&mut conn, id, "pending").await;

        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Pending
        );

        sqlx::query("UPDATE files SET review_status = 'approved' WHERE id = ?")
            .bind(a)
            .execute(&mut *conn)
            .await
            .unwrap();
        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Pending
        );

        for photo_id in [b, c] {
            sqlx::query("UPDATE files SET review_status = 'approved' WHERE id = ?")
                .bind(photo_id)
                .execute(&mut *conn)
                .await
                .unwrap();
        }
        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Approved
        );

        sqlx::query("UPDATE files SET review_status = 'rejected' WHERE id = ?")
            .bind(a)
            .execute(&mut *conn)
            .await
            .unwrap();
        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Rejected
        );

        let row = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(row.status, SubmissionStatus::Rejected);
    }

    #[tokio::test]
    async fn recompute_without_photos_is_pending() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, "Boris", "South", "boris@example.com", "", "")
            .await
            .unwrap();
        set_status(&mut conn, id, SubmissionStatus::Approved)
            .await
            .unwrap();

        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Pending
        );
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, "Vera", "East", "vera@example.com", "", "")
            .await
            .unwrap();
        insert_photo_row(&mut conn, id, "approved").await;

        let first = recompute_status(&mut conn, id).await.unwrap();
        let second = recompute_status(&mut conn, id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, SubmissionStatus::Approved);
    }

    #[tokio::test]
    async fn originals_do_not_count_toward_status() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, "Dmitri", "West", "dmitri@example.com", "", "")
            .await
            .unwrap();
        insert_photo_row(&mut conn, id, "approved").await;
        sqlx::query(
            r#"
            INSERT INTO files (submission_id, file_name, file_path, file_size, is_original)
            VALUES (?, 'raw.dng', 'uploads/raw.dng', 9000000, 1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .unwrap();

        assert_eq!(
            recompute_status(&mut conn, id).await.unwrap(),
            SubmissionStatus::Approved
        );
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, "Olga", "North", "  Olga@Example.COM ", "", "")
            .await
            .unwrap();

        let found = get_by_email(&mut conn, "olga@example.com")
            .await
            .unwrap()
            .expect("submission not found");
        assert_eq!(found.id, id);
        assert_eq!(found.email, "olga@example.com");

        let found = get_by_email(&mut conn, "OLGA@EXAMPLE.COM").await.unwrap();
        assert!(found.is_some());
    }
}
