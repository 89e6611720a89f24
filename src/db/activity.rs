//! Append-only activity log, keyed by actor, day bucket and district.

use crate::models::ActionType;
use crate::time;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Listings never return more than this many entries.
const LIST_LIMIT: i64 = 500;

static PHOTO_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").expect("valid regex"));

/// One activity log row as read back for display.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub id: i64,
    pub actor_email: String,
    pub actor_name: String,
    pub district: String,
    pub action_type: String,
    pub details: String,
    pub created_at_iso: String,
}

fn entry_from_row(row: &SqliteRow) -> ActivityEntry {
    ActivityEntry {
        id: row.get("id"),
        actor_email: row.get("actor_email"),
        actor_name: row.get::<Option<String>, _>("actor_name").unwrap_or_default(),
        district: row.get::<Option<String>, _>("district").unwrap_or_default(),
        action_type: row.get("action_type"),
        details: row.get::<Option<String>, _>("details").unwrap_or_default(),
        created_at_iso: row.get("created_at_iso"),
    }
}

/// Extract an embedded "#<id>" photo reference from a details string.
/// A soft reference: resolution against deleted files yields nothing.
pub fn extract_photo_id(details: &str) -> Option<i64> {
    PHOTO_ID_RE
        .captures(details)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Append one entry. Entries are immutable and never deleted by the service.
pub async fn log(
    conn: &mut SqliteConnection,
    actor_email: &str,
    actor_name: &str,
    district: &str,
    action: ActionType,
    details: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_logs (actor_email, actor_name, district, action_type, details, created_at_iso, created_day)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(actor_email.trim().to_lowercase())
    .bind(actor_name.trim())
    .bind(district.trim())
    .bind(action.as_str())
    .bind(details)
    .bind(time::now_iso())
    .bind(time::today_key())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Newest-first listing, optionally filtered by day bucket and district.
pub async fn list(
    conn: &mut SqliteConnection,
    day: Option<&str>,
    district: Option<&str>,
) -> Result<Vec<ActivityEntry>> {
    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "SELECT id, actor_email, actor_name, district, action_type, details, created_at_iso FROM activity_logs",
    );

    let day = day.map(str::trim).filter(|d| !d.is_empty());
    let district = district.map(str::trim).filter(|d| !d.is_empty());

    if let Some(day) = day {
        builder.push(" WHERE created_day = ").push_bind(day.to_string());
    }
    if let Some(district) = district {
        builder.push(if day.is_some() { " AND " } else { " WHERE " });
        builder.push("district = ").push_bind(district.to_string());
    }
    builder.push(" ORDER BY id DESC LIMIT ").push_bind(LIST_LIMIT);

    let rows = builder.build().fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(entry_from_row).collect())
}

/// Distinct non-empty districts, for the admin filter dropdown.
pub async fn distinct_districts(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT district
        FROM activity_logs
        WHERE district IS NOT NULL AND district <> ''
        ORDER BY district
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(|row| row.get("district")).collect())
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

    #[test]
    fn photo_reference_extraction() {
        assert_eq!(extract_photo_id("Deleted photo #42"), Some(42));
        assert_eq!(extract_photo_id("Uploaded 3 original(s) for photo #7"), Some(7));
        assert_eq!(extract_photo_id("Updated profile"), None);
        assert_eq!(extract_photo_id(""), None);
    }

    #[tokio::test]
    async fn list_filters_by_day_and_district() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        log(
            &mut conn,
            "A@Example.com",
            " Anna ",
            " North ",
            ActionType::SubmissionCreated,
            "Created submission and uploaded 2 photo(s)",
        )
        .await
        .unwrap();
        log(
            &mut conn,
            "b@example.com",
            "Boris",
            "South",
            ActionType::PhotoDeleted,
            "Deleted photo #3",
        )
        .await
        .unwrap();

        let all = list(&mut conn, None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        // newest first
        assert_eq!(all[0].action_type, "photo_deleted");
        // actor fields normalized at write time
        assert_eq!(all[1].actor_email, "a@example.com");
        assert_eq!(all[1].actor_name, "Anna");

        let north = list(&mut conn, None, Some("North")).await.unwrap();
        assert_eq!(north.len(), 1);
        assert_eq!(north[0].district, "North");

        let today = list(&mut conn, Some(&crate::time::today_key()), Some("South"))
            .await
            .unwrap();
        assert_eq!(today.len(), 1);

        let none = list(&mut conn, Some("1999-01-01"), None).await.unwrap();
        assert!(none.is_empty());

        let districts = distinct_districts(&mut conn).await.unwrap();
        assert_eq!(districts, vec!["North".to_string(), "South".to_string()]);
    }
}
