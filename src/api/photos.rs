//! Photo-level endpoints: per-photo originals and deletion.

use crate::api::payload::build_submission_payload;
use crate::api::read_multipart;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{ActionType, FileKind, ReviewStatus, StoredFile, Submission};
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::SqliteConnection;

pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/photos/:id/originals",
            post(upload_photo_originals).delete(delete_photo_originals),
        )
        .route("/api/photos/:id", delete(delete_photo))
        .route("/api/originals/:id", delete(delete_original))
}

async fn load_photo(
    conn: &mut SqliteConnection,
    photo_id: i64,
) -> Result<(StoredFile, Submission), ApiError> {
    let file = db::files::get(conn, photo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;
    let submission = db::submissions::get_by_id(conn, file.submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    Ok((file, submission))
}

/// POST /api/photos/:id/originals (multipart: originals[]).
///
/// Allowed only for an approved photo; replaces the originals already linked
/// to it.
async fn upload_photo_originals(
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let (_fields, uploads) = read_multipart(multipart, "originals").await?;
    if uploads.is_empty() {
        return Err(ApiError::Validation("No files selected".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let (photo, submission) = load_photo(&mut tx, photo_id).await?;
    match &photo.kind {
        FileKind::Original { .. } => {
            return Err(ApiError::Validation(
                "Cannot upload originals for an original".to_string(),
            ));
        }
        FileKind::Photo { review_status, .. } => {
            if *review_status != ReviewStatus::Approved {
                return Err(ApiError::Validation(
                    "Originals can only be uploaded for an approved photo".to_string(),
                ));
            }
        }
    }

    let removed = db::files::delete_photo_originals(&mut tx, photo_id).await?;

    let stored = state.store.store_original_batch(submission.id, &uploads)?;
    for entry in &stored {
        db::files::insert_original(&mut tx, submission.id, Some(photo_id), entry).await?;
    }
    db::submissions::touch(&mut tx, submission.id).await?;

    db::activity::log(
        &mut tx,
        &submission.email,
        &submission.name,
        &submission.district,
        ActionType::PhotoOriginalUploaded,
        &format!("Uploaded {} original(s) for photo #{photo_id}", uploads.len()),
    )
    .await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    for file in &removed {
        state.store.remove_artifacts(file);
    }

    Ok(Json(json!({ "ok": true, "submission": payload })))
}

/// DELETE /api/photos/:id/originals
///
/// Removes every original linked to the photo. Does not touch the photo's
/// review state, so no status recomputation.
async fn delete_photo_originals(
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let (photo, submission) = load_photo(&mut tx, photo_id).await?;
    if photo.is_original() {
        return Err(ApiError::Validation(
            "Cannot delete originals of an original".to_string(),
        ));
    }

    let removed = db::files::delete_photo_originals(&mut tx, photo_id).await?;
    db::submissions::touch(&mut tx, submission.id).await?;

    db::activity::log(
        &mut tx,
        &submission.email,
        &submission.name,
        &submission.district,
        ActionType::PhotoOriginalDeleted,
        &format!("Deleted originals for photo #{photo_id}"),
    )
    .await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    for file in &removed {
        state.store.remove_artifacts(file);
    }

    Ok(Json(json!({ "ok": true, "submission": payload })))
}

/// DELETE /api/originals/:id — remove a single original file.
async fn delete_original(
    State(state): State<AppState>,
    Path(original_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let file = db::files::get(&mut tx, original_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Original not found".to_string()))?;
    if !file.is_original() {
        return Err(ApiError::Validation("File is not an original".to_string()));
    }
    let submission = db::submissions::get_by_id(&mut tx, file.submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    db::files::delete_file(&mut tx, original_id).await?;
    db::submissions::touch(&mut tx, submission.id).await?;

    db::activity::log(
        &mut tx,
        &submission.email,
        &submission.name,
        &submission.district,
        ActionType::PhotoOriginalDeleted,
        &format!(
            "Deleted original #{original_id} for photo #{}",
            file.parent_photo_id().unwrap_or(0)
        ),
    )
    .await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    state.store.remove_artifacts(&file);

    Ok(Json(json!({ "ok": true, "submission": payload })))
}

/// DELETE /api/photos/:id
///
/// Deletes the photo and every original linked to it, then re-derives the
/// submission's status from the remaining photos.
async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let (photo, submission) = load_photo(&mut tx, photo_id).await?;
    if photo.is_original() {
        return Err(ApiError::Validation("File is not a photo".to_string()));
    }

    let mut removed = db::files::delete_photo_originals(&mut tx, photo_id).await?;
    db::files::delete_file(&mut tx, photo_id).await?;
    removed.push(photo);

    db::submissions::recompute_status(&mut tx, submission.id).await?;

    db::activity::log(
        &mut tx,
        &submission.email,
        &submission.name,
        &submission.district,
        ActionType::PhotoDeleted,
        &format!("Deleted photo #{photo_id}"),
    )
    .await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    for file in &removed {
        state.store.remove_artifacts(file);
    }

    Ok(Json(json!({ "ok": true, "submission": payload })))
}
