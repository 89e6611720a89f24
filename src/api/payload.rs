//! JSON payload shapes for submission listings.

use crate::db;
use crate::models::{FileKind, StoredFile, Submission};
use anyhow::Result;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub url: String,
    /// Falls back to the full image URL when no thumbnail exists.
    pub thumb_url: String,
    pub status: String,
    pub comment: String,
    pub parent_photo_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originals: Option<Vec<FilePayload>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub id: i64,
    pub name: String,
    pub district: String,
    pub email: String,
    pub phone: String,
    pub comment: String,
    pub status: String,
    pub admin_comment: String,
    pub created_at: String,
    pub updated_at: String,
    pub photos: Vec<FilePayload>,
    pub originals: Vec<FilePayload>,
}

pub fn file_url(rel_path: &str) -> String {
    format!("/{}", rel_path.replace('\\', "/"))
}

fn file_payload(file: &StoredFile) -> FilePayload {
    let url = file_url(&file.file_path);
    let (status, comment, thumb_url, parent_photo_id) = match &file.kind {
        FileKind::Photo {
            review_status,
            review_comment,
            thumb_path,
        } => (
            review_status.as_str().to_string(),
            review_comment.clone(),
            thumb_path
                .as_deref()
                .map(file_url)
                .unwrap_or_else(|| url.clone()),
            None,
        ),
        FileKind::Original { parent_photo_id } => (
            "pending".to_string(),
            String::new(),
            url.clone(),
            *parent_photo_id,
        ),
    };

    FilePayload {
        id: file.id,
        name: file.file_name.clone(),
        size: file.file_size,
        url,
        thumb_url,
        status,
        comment,
        parent_photo_id,
        originals: None,
    }
}

/// Assemble the full payload for one submission: photos carry their linked
/// originals, loose originals hang off the submission itself.
pub async fn build_submission_payload(
    conn: &mut SqliteConnection,
    submission: &Submission,
) -> Result<SubmissionPayload> {
    let files = db::files::list_for_submission(conn, submission.id).await?;

    let mut originals_by_photo: HashMap<i64, Vec<FilePayload>> = HashMap::new();
    let mut submission_originals = Vec::new();
    for file in files.iter().filter(|f| f.is_original()) {
        let payload = file_payload(file);
        match file.parent_photo_id() {
            Some(photo_id) => originals_by_photo.entry(photo_id).or_default().push(payload),
            None => submission_originals.push(payload),
        }
    }

    let mut photos = Vec::new();
    for file in files.iter().filter(|f| !f.is_original()) {
        let mut payload = file_payload(file);
        payload.originals = Some(originals_by_photo.remove(&file.id).unwrap_or_default());
        photos.push(payload);
    }

    Ok(SubmissionPayload {
        id: submission.id,
        name: submission.name.clone(),
        district: submission.district.clone(),
        email: submission.email.clone(),
        phone: submission.phone.clone(),
        comment: submission.comment.clone(),
        status: submission.status.as_str().to_string(),
        admin_comment: submission.admin_comment.clone(),
        created_at: submission.created_at.clone(),
        updated_at: submission.updated_at.clone(),
        photos,
        originals: submission_originals,
    })
}
