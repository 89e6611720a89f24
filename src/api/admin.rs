//! Admin endpoints: login, review actions, listings, activity log.

use crate::api::payload::{build_submission_payload, file_url, SubmissionPayload};
use crate::api::encode_email;
use crate::api::session::{self, AdminSession};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{FileKind, ReviewStatus, SubmissionStatus};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::SignedCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/session", get(session_info))
        .route("/api/admin/submissions", get(list_submissions))
        .route("/api/admin/activities", get(list_activities))
        .route(
            "/api/admin/submissions/:id/status",
            post(set_submission_status),
        )
        .route(
            "/api/admin/submissions/:id/comment",
            post(set_submission_comment),
        )
        .route("/api/admin/photos/:id/review", post(review_photo))
        .route("/api/admin/photos/:id/comment", post(set_photo_comment))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /api/admin/login
async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    body: Option<Json<LoginBody>>,
) -> ApiResult<(SignedCookieJar, Json<Value>)> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;

    if body.username == state.config.admin_username
        && body.password == state.config.admin_password
    {
        Ok((session::login(jar), Json(json!({ "ok": true }))))
    } else {
        Err(ApiError::Auth("Invalid username or password".to_string()))
    }
}

/// POST /api/admin/logout
async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Json<Value>) {
    (session::logout(jar), Json(json!({ "ok": true })))
}

/// GET /api/admin/session
async fn session_info(jar: SignedCookieJar) -> Json<Value> {
    Json(json!({ "isAdmin": session::is_admin(&jar) }))
}

#[derive(Debug, Deserialize)]
struct SubmissionFilter {
    status: Option<String>,
}

/// GET /api/admin/submissions?status=all|pending|approved|rejected
///
/// Every submission's status is re-derived before filtering, so stale direct
/// sets never leak into the listing.
async fn list_submissions(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> ApiResult<Json<Vec<SubmissionPayload>>> {
    let status_filter = filter
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(|s| {
            SubmissionStatus::parse(s)
                .ok_or_else(|| ApiError::Validation("Invalid status".to_string()))
        })
        .transpose()?;

    let mut tx = state.db.begin().await?;

    let submissions = db::submissions::list_all(&mut tx).await?;
    let mut payloads = Vec::new();
    for submission in &submissions {
        let status = db::submissions::recompute_status(&mut tx, submission.id).await?;
        if let Some(wanted) = status_filter {
            if status != wanted {
                continue;
            }
        }
        let refreshed = db::submissions::get_by_id(&mut tx, submission.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
        payloads.push(build_submission_payload(&mut tx, &refreshed).await?);
    }

    tx.commit().await?;

    Ok(Json(payloads))
}

#[derive(Debug, Deserialize)]
struct ActivityFilter {
    day: Option<String>,
    district: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityItem {
    id: i64,
    actor_email: String,
    actor_name: String,
    district: String,
    action_type: String,
    details: String,
    created_at: String,
    profile_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
}

/// GET /api/admin/activities?day=YYYY-MM-DD&district=
///
/// Resolves "#<id>" photo references in entry details to image URLs where the
/// file still exists; references to deleted files simply resolve to nothing.
async fn list_activities(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.db.acquire().await?;

    let entries =
        db::activity::list(&mut conn, filter.day.as_deref(), filter.district.as_deref()).await?;
    let districts = db::activity::distinct_districts(&mut conn).await?;

    let photo_ids: HashSet<i64> = entries
        .iter()
        .filter_map(|entry| db::activity::extract_photo_id(&entry.details))
        .collect();
    let photo_ids: Vec<i64> = photo_ids.into_iter().collect();
    let urls: HashMap<i64, String> = db::files::list_by_ids(&mut conn, &photo_ids)
        .await?
        .into_iter()
        .map(|file| (file.id, file_url(&file.file_path)))
        .collect();

    let items: Vec<ActivityItem> = entries
        .into_iter()
        .map(|entry| {
            let photo_url = db::activity::extract_photo_id(&entry.details)
                .and_then(|id| urls.get(&id).cloned());
            ActivityItem {
                id: entry.id,
                profile_url: format!("/user/{}", encode_email(&entry.actor_email)),
                actor_email: entry.actor_email,
                actor_name: entry.actor_name,
                district: entry.district,
                action_type: entry.action_type,
                details: entry.details,
                created_at: entry.created_at_iso,
                photo_url,
            }
        })
        .collect();

    Ok(Json(json!({ "items": items, "districts": districts })))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
}

/// POST /api/admin/submissions/:id/status
///
/// Direct set, no recomputation. A later recompute re-derives the status from
/// the photos and may overwrite it.
async fn set_submission_status(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    body: Option<Json<StatusBody>>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;
    let status = SubmissionStatus::parse(&body.status)
        .ok_or_else(|| ApiError::Validation("Invalid status".to_string()))?;

    let mut conn = state.db.acquire().await?;
    db::submissions::set_status(&mut conn, submission_id, status).await?;

    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    #[serde(default)]
    comment: String,
}

/// POST /api/admin/submissions/:id/comment
async fn set_submission_comment(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    body: Option<Json<CommentBody>>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;

    let mut conn = state.db.acquire().await?;
    db::submissions::set_admin_comment(&mut conn, submission_id, body.comment.trim()).await?;

    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    comment: String,
}

/// POST /api/admin/photos/:id/status
///
/// Sets a photo's verdict, re-derives the submission status and notifies the
/// submitter.
async fn review_photo(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
    body: Option<Json<ReviewBody>>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;
    let status = ReviewStatus::parse(&body.status)
        .filter(|s| *s != ReviewStatus::Pending)
        .ok_or_else(|| ApiError::Validation("Invalid photo status".to_string()))?;

    let mut tx = state.db.begin().await?;

    let photo = db::files::get(&mut tx, photo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;
    if photo.is_original() {
        return Err(ApiError::Validation(
            "Originals cannot be reviewed".to_string(),
        ));
    }
    let submission = db::submissions::get_by_id(&mut tx, photo.submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    db::files::set_review(&mut tx, photo_id, status, body.comment.trim()).await?;
    let submission_status = db::submissions::recompute_status(&mut tx, submission.id).await?;

    tx.commit().await?;

    let mut mail = format!(
        "Your photo \"{}\" was reviewed: {}.\n",
        photo.file_name,
        status.label()
    );
    let comment = body.comment.trim();
    if !comment.is_empty() {
        mail.push_str(&format!("Comment: {comment}\n"));
    }
    state.notifier.queue(
        &submission.email,
        &format!("PhotoReview: photo #{photo_id} - {}", status.label()),
        &mail,
    );

    Ok(Json(json!({
        "ok": true,
        "submissionStatus": submission_status.as_str(),
    })))
}

/// POST /api/admin/photos/:id/comment
///
/// Notifies the submitter only when the comment is non-empty and actually
/// changed.
async fn set_photo_comment(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(photo_id): Path<i64>,
    body: Option<Json<CommentBody>>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.ok_or_else(|| ApiError::Validation("Invalid JSON body".to_string()))?;
    let comment = body.comment.trim().to_string();

    let mut tx = state.db.begin().await?;

    let photo = db::files::get(&mut tx, photo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;
    let previous = match &photo.kind {
        FileKind::Photo { review_comment, .. } => review_comment.clone(),
        FileKind::Original { .. } => {
            return Err(ApiError::Validation(
                "Originals cannot be commented".to_string(),
            ));
        }
    };
    let submission = db::submissions::get_by_id(&mut tx, photo.submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    db::files::set_review_comment(&mut tx, photo_id, &comment).await?;

    tx.commit().await?;

    if !comment.is_empty() && comment != previous {
        state.notifier.queue(
            &submission.email,
            &format!("PhotoReview: comment on photo #{photo_id}"),
            &format!(
                "Your photo \"{}\" received a comment:\n{comment}\n",
                photo.file_name
            ),
        );
    }

    Ok(Json(json!({ "ok": true })))
}
