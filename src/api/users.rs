//! User cabinet endpoints, keyed by email.

use crate::api::payload::{build_submission_payload, SubmissionPayload};
use crate::api::{encode_email, read_multipart};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::ActionType;
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/:email", get(get_user).put(update_profile))
        .route("/api/users/:email/photos", post(upload_photos))
}

/// GET /api/users/:email
async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<SubmissionPayload>> {
    let email = email.trim().to_lowercase();

    let mut conn = state.db.acquire().await?;
    let submission = db::submissions::get_by_email(&mut conn, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let payload = build_submission_payload(&mut conn, &submission).await?;
    Ok(Json(payload))
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    comment: String,
}

/// PUT /api/users/:email
///
/// Upserts the profile without touching files or review state. A created
/// profile starts pending with no photos.
async fn update_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
    body: Option<Json<ProfileBody>>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;

    let email = email.trim().to_lowercase();
    let name = body.name.trim().to_string();
    let district = body.district.trim().to_string();
    let phone = body.phone.trim().to_string();
    let comment = body.comment.trim().to_string();

    if email.is_empty() || name.is_empty() || district.is_empty() {
        return Err(ApiError::Validation(
            "Name, district and email are required".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;

    let existing = db::submissions::get_by_email(&mut tx, &email).await?;
    let submission_id = match existing {
        Some(submission) => {
            db::submissions::update_profile(
                &mut tx,
                submission.id,
                &name,
                &district,
                &phone,
                &comment,
            )
            .await?;
            db::activity::log(
                &mut tx,
                &email,
                &name,
                &district,
                ActionType::ProfileUpdated,
                "Updated profile",
            )
            .await?;
            submission.id
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
                ActionType::ProfileCreated,
                "Created profile",
            )
            .await?;
            id
        }
    };

    let submission = db::submissions::get_by_id(&mut tx, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &submission).await?;

    tx.commit().await?;

    Ok(Json(json!({ "ok": true, "user": payload })))
}

/// POST /api/users/:email/photos (multipart: photos[]).
///
/// Appends photos to an existing submission and re-derives its status. A new
/// pending photo therefore pulls an approved submission back to pending.
async fn upload_photos(
    State(state): State<AppState>,
    Path(email): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let email = email.trim().to_lowercase();
    let (_fields, uploads) = read_multipart(multipart, "photos").await?;
    if uploads.is_empty() {
        return Err(ApiError::Validation("Attach at least one photo".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let submission = db::submissions::get_by_email(&mut tx, &email)
        .await?
        .ok_or_else(|| ApiError::Validation("Fill out your profile first".to_string()))?;

    let stored = state.store.store_photo_batch(submission.id, &uploads)?;
    for entry in &stored {
        db::files::insert_photo(&mut tx, submission.id, entry).await?;
    }
    db::submissions::recompute_status(&mut tx, submission.id).await?;

    db::activity::log(
        &mut tx,
        &email,
        &submission.name,
        &submission.district,
        ActionType::PhotosUploaded,
        &format!("Uploaded {} new photo(s)", uploads.len()),
    )
    .await?;

    let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let payload = build_submission_payload(&mut tx, &refreshed).await?;

    tx.commit().await?;

    let cabinet = state
        .config
        .public_url(&format!("/user/{}", encode_email(&email)));
    state.notifier.queue(
        &state.config.admin_notify_email,
        "PhotoReview: user uploaded new photos",
        &format!(
            "User: {}\nEmail: {email}\nDistrict: {}\nNew photos: {}\nCabinet: {cabinet}\n",
            submission.name,
            submission.district,
            uploads.len()
        ),
    );

    Ok(Json(json!({ "ok": true, "user": payload })))
}
