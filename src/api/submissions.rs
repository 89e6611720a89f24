//! Submission endpoints: submit/resubmit, listing, submission-level originals.

use crate::api::payload::{build_submission_payload, SubmissionPayload};
use crate::api::{encode_email, read_multipart};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{ActionType, SubmissionStatus};
use crate::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/submissions", post(submit).get(list_by_email))
        .route("/api/submissions/:id/originals", post(upload_originals))
}

/// POST /api/submissions (multipart: name, district, email, phone, comment,
/// photos[]).
///
/// A resubmission under an existing email overwrites the profile, resets
/// status and admin comment, and replaces every prior file. All database
/// writes commit as a unit; prior artifacts are unlinked only after commit.
async fn submit(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let (fields, uploads) = read_multipart(multipart, "photos").await?;

    let get = |key: &str| fields.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
    let name = get("name");
    let district = get("district");
    let email = get("email").to_lowercase();
    let phone = get("phone");
    let comment = get("comment");

    if name.is_empty() || district.is_empty() || email.is_empty() {
        return Err(ApiError::Validation(
            "Name, district and email are required".to_string(),
        ));
    }
    if uploads.is_empty() {
        return Err(ApiError::Validation("Attach at least one photo".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let existing = db::submissions::get_by_email(&mut tx, &email).await?;
    let (submission_id, removed) = match existing {
        Some(submission) => {
            db::submissions::reset_for_resubmission(
                &mut tx,
                submission.id,
                &name,
                &district,
                &phone,
                &comment,
            )
            .await?;
            let removed = db::files::delete_submission_files(&mut tx, submission.id, false).await?;
            db::activity::log(
                &mut tx,
                &email,
                &name,
                &district,
                ActionType::SubmissionUpdated,
                &format!("Updated submission and uploaded {} photo(s)", uploads.len()),
            )
            .await?;
            (submission.id, removed)
        }
        None => {
            let id =
                db::submissions::insert(&mut tx, &name, &district, &email, &phone, &comment)
                    .await?;
            db::activity::log(
                &mut tx,
                &email,
                &name,
                &district,
                ActionType::SubmissionCreated,
                &format!("Created submission and uploaded {} photo(s)", uploads.len()),
            )
            .await?;
            (id, Vec::new())
        }
    };

    // A failing file aborts here: the transaction rolls back and the batch
    // cleans up its own artifacts.
    let stored = state.store.store_photo_batch(submission_id, &uploads)?;
    for entry in &stored {
        db::files::insert_photo(&mut tx, submission_id, entry).await?;
    }
    db::submissions::recompute_status(&mut tx, submission_id).await?;

    tx.commit().await?;

    for file in &removed {
        state.store.remove_artifacts(file);
    }

    let cabinet = state
        .config
        .public_url(&format!("/user/{}", encode_email(&email)));
    state.notifier.queue(
        &state.config.admin_notify_email,
        "PhotoReview: new photo upload",
        &format!(
            "User: {name}\nEmail: {email}\nDistrict: {district}\nPhotos: {}\nCabinet: {cabinet}\n",
            uploads.len()
        ),
    );

    Ok(Json(json!({ "ok": true, "submissionId": submission_id })))
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

/// GET /api/submissions?email=
async fn list_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<Vec<SubmissionPayload>>> {
    let email = query.email.unwrap_or_default().trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    let mut conn = state.db.acquire().await?;
    let submissions = db::submissions::list_by_email(&mut conn, &email).await?;

    let mut payloads = Vec::with_capacity(submissions.len());
    for submission in &submissions {
        payloads.push(build_submission_payload(&mut conn, submission).await?);
    }

    Ok(Json(payloads))
}

/// POST /api/submissions/:id/originals (multipart: originals[]).
///
/// Allowed only for approved submissions; replaces all submission-level
/// originals.
async fn upload_originals(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let (_fields, uploads) = read_multipart(multipart, "originals").await?;
    if uploads.is_empty() {
        return Err(ApiError::Validation("No files selected".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let submission = db::submissions::get_by_id(&mut tx, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    if submission.status != SubmissionStatus::Approved {
        return Err(ApiError::Validation(
            "Originals can only be uploaded for approved submissions".to_string(),
        ));
    }

    let removed = db::files::delete_submission_files(&mut tx, submission_id, true).await?;

    let stored = state.store.store_original_batch(submission_id, &uploads)?;
    for entry in &stored {
        db::files::insert_original(&mut tx, submission_id, None, entry).await?;
    }
    db::submissions::touch(&mut tx, submission_id).await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    for file in &removed {
        state.store.remove_artifacts(file);
    }

    Ok(Json(json!({ "ok": true, "submission": payload })))
}
