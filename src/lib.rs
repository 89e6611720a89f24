//! photoreview - municipal photo submission and review service.
//!
//! Citizens submit photographs for review; an administrator approves, rejects
//! and comments on them. A submission's overall status is always re-derived
//! from its photos' review statuses after every mutation that can change
//! them. Key transitions queue fire-and-forget email notifications, and every
//! user-visible action lands in an append-only activity log.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod time;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::Router;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body. Originals can be large camera files.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<config::Config>,
    pub store: Arc<ingest::ContentStore>,
    pub notifier: notify::Notifier,
    cookie_key: Key,
}

impl AppState {
    pub fn new(db: SqlitePool, config: config::Config) -> Self {
        let store = Arc::new(ingest::ContentStore::new(&config.uploads_dir));
        let notifier = notify::Notifier::from_config(&config.smtp);
        let cookie_key = derive_cookie_key(&config.secret_key);
        Self {
            db,
            config: Arc::new(config),
            store,
            notifier,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

/// Cookie signing key derived from the configured secret.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha256::digest(secret.as_bytes());
    Key::derive_from(&digest)
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads_dir.clone();

    Router::new()
        .merge(api::submission_routes())
        .merge(api::user_routes())
        .merge(api::photo_routes())
        .merge(api::admin_routes())
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
