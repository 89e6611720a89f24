//! Admin session cookie handling.
//!
//! The session is a signed cookie validated per request; there is no
//! process-wide session state.

use crate::error::ApiError;
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::SignedCookieJar;

pub const ADMIN_COOKIE: &str = "photoreview_admin";

const AUTH_REQUIRED: &str = "Admin authorization required";

/// Extractor proving the request carries a valid admin session cookie.
/// Runs before any handler-level validation.
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth(AUTH_REQUIRED.to_string()))?;

        if is_admin(&jar) {
            Ok(AdminSession)
        } else {
            Err(ApiError::Auth(AUTH_REQUIRED.to_string()))
        }
    }
}

pub fn is_admin(jar: &SignedCookieJar) -> bool {
    jar.get(ADMIN_COOKIE)
        .map(|cookie| cookie.value() == "1")
        .unwrap_or(false)
}

pub fn login(jar: SignedCookieJar) -> SignedCookieJar {
    let mut cookie = Cookie::new(ADMIN_COOKIE, "1");
    cookie.set_path("/");
    cookie.set_http_only(true);
    jar.add(cookie)
}

pub fn logout(jar: SignedCookieJar) -> SignedCookieJar {
    let mut cookie = Cookie::new(ADMIN_COOKIE, "");
    cookie.set_path("/");
    jar.remove(cookie)
}
