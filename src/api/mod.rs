//! HTTP API handlers.

pub mod admin;
pub mod payload;
pub mod photos;
pub mod session;
pub mod submissions;
pub mod users;

pub use admin::admin_routes;
pub use photos::photo_routes;
pub use submissions::submission_routes;
pub use users::user_routes;

use crate::error::ApiError;
use crate::ingest::Upload;
use axum::extract::Multipart;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;

/// Drain a multipart request into text fields plus the uploads of one file
/// field.
pub(crate) async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<(HashMap<String, String>, Vec<Upload>), ApiError> {
    let mut fields = HashMap::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("Malformed multipart request: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or("file").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::Validation(format!("Failed to read uploaded file: {err}")))?;
            if bytes.is_empty() {
                continue;
            }
            uploads.push(Upload {
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.unwrap_or_default();
            fields.insert(name, value);
        }
    }

    Ok((fields, uploads))
}

/// Percent-encode an email for use in a cabinet URL path segment.
pub(crate) fn encode_email(email: &str) -> String {
    utf8_percent_encode(email, NON_ALPHANUMERIC).to_string()
}
