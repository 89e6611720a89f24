//! Upload validation and content storage.
//!
//! Photos are checked in order: extension, then byte size, then
//! decodability/width. A batch stops at the first failing file and leaves no
//! artifact behind. Originals are accepted as-is. Stored names are derived
//! from the submission id plus a random token, so the user-supplied filename
//! is kept only as display metadata.

use crate::error::ApiError;
use crate::models::{FileKind, StoredFile};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
pub const MIN_IMAGE_SIZE_BYTES: usize = 250 * 1024;
pub const MIN_IMAGE_WIDTH: u32 = 2000;

const THUMB_MAX_PX: u32 = 400;
const THUMB_QUALITY: u8 = 75;

/// One file pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result of persisting one upload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Sanitized display name.
    pub file_name: String,
    pub file_size: i64,
    /// Storage-relative path, e.g. "uploads/12_3f9a...c2.jpg".
    pub file_path: String,
    /// Storage-relative thumbnail path; photos only, and absent when
    /// thumbnail generation failed.
    pub thumb_path: Option<String>,
}

/// Strip path components and unsafe characters from a user-supplied filename.
pub fn sanitize_file_name(raw: &str) -> String {
    let normalized = raw.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Check one photo upload against the ingestion rules. Extension, size and
/// width violations each carry a message naming the offending file.
pub fn validate_photo(upload: &Upload) -> Result<(), ApiError> {
    let name = sanitize_file_name(&upload.file_name);

    let ext = extension_of(&name);
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::Validation(format!(
            "File {name}: only JPG, PNG and WEBP are allowed"
        )));
    }

    if upload.bytes.len() < MIN_IMAGE_SIZE_BYTES {
        return Err(ApiError::Validation(format!(
            "File {name} is too small. Minimum size is 250 KiB"
        )));
    }

    let width = image::ImageReader::new(Cursor::new(&upload.bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .map(|(width, _height)| width)
        .ok_or_else(|| {
            ApiError::Validation(format!("File {name} is not recognized as an image"))
        })?;

    if width < MIN_IMAGE_WIDTH {
        return Err(ApiError::Validation(format!(
            "File {name} is too narrow. Minimum width is {MIN_IMAGE_WIDTH}px"
        )));
    }

    Ok(())
}

/// Filesystem store for uploaded content and thumbnails.
#[derive(Debug)]
pub struct ContentStore {
    uploads_dir: PathBuf,
    thumbs_dir: PathBuf,
}

impl ContentStore {
    pub fn new(uploads_dir: &Path) -> Self {
        Self {
            uploads_dir: uploads_dir.to_path_buf(),
            thumbs_dir: uploads_dir.join("thumbs"),
        }
    }

    /// Validate and persist a batch of photos. The whole batch succeeds or no
    /// artifact of it remains on disk.
    pub fn store_photo_batch(
        &self,
        submission_id: i64,
        uploads: &[Upload],
    ) -> Result<Vec<StoredUpload>, ApiError> {
        for upload in uploads {
            validate_photo(upload)?;
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.store(submission_id, upload, false) {
                Ok(entry) => stored.push(entry),
                Err(err) => {
                    for entry in &stored {
                        self.remove(&entry.file_path);
                        if let Some(thumb) = &entry.thumb_path {
                            self.remove(thumb);
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(stored)
    }

    /// Persist a batch of originals. No validation, no thumbnails.
    pub fn store_original_batch(
        &self,
        submission_id: i64,
        uploads: &[Upload],
    ) -> Result<Vec<StoredUpload>, ApiError> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.store(submission_id, upload, true) {
                Ok(entry) => stored.push(entry),
                Err(err) => {
                    for entry in &stored {
                        self.remove(&entry.file_path);
                    }
                    return Err(err);
                }
            }
        }
        Ok(stored)
    }

    /// Persist one upload under a unique name; photos additionally get a
    /// bounded JPEG thumbnail. Thumbnail failure does not reject the upload.
    fn store(
        &self,
        submission_id: i64,
        upload: &Upload,
        original: bool,
    ) -> Result<StoredUpload, ApiError> {
        let display_name = sanitize_file_name(&upload.file_name);
        let ext = extension_of(&display_name);

        let unique_name = format!("{submission_id}_{}{ext}", Uuid::new_v4().simple());
        let save_path = self.uploads_dir.join(&unique_name);
        std::fs::write(&save_path, &upload.bytes)?;

        let mut thumb_path = None;
        if !original {
            match self.write_thumbnail(submission_id, &upload.bytes) {
                Ok(rel_path) => thumb_path = Some(rel_path),
                Err(err) => {
                    tracing::warn!("thumbnail generation failed for {display_name}: {err}");
                }
            }
        }

        Ok(StoredUpload {
            file_name: display_name,
            file_size: upload.bytes.len() as i64,
            file_path: format!("uploads/{unique_name}"),
            thumb_path,
        })
    }

    fn write_thumbnail(&self, submission_id: i64, bytes: &[u8]) -> anyhow::Result<String> {
        let source = image::load_from_memory(bytes)?;
        let thumb =
            image::DynamicImage::ImageRgb8(source.thumbnail(THUMB_MAX_PX, THUMB_MAX_PX).into_rgb8());

        let mut encoded = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, THUMB_QUALITY);
        thumb.write_with_encoder(encoder)?;

        let thumb_name = format!("{submission_id}_{}_thumb.jpg", Uuid::new_v4().simple());
        std::fs::write(self.thumbs_dir.join(&thumb_name), &encoded)?;

        Ok(format!("uploads/thumbs/{thumb_name}"))
    }

    /// Best-effort removal of one stored artifact; a missing file is fine.
    pub fn remove(&self, rel_path: &str) {
        let normalized = rel_path.replace('\\', "/");
        let Some(name) = normalized.rsplit('/').next().filter(|n| !n.is_empty()) else {
            return;
        };

        let dir = if normalized.contains("thumbs/") {
            &self.thumbs_dir
        } else {
            &self.uploads_dir
        };

        if let Err(err) = std::fs::remove_file(dir.join(name)) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to remove {rel_path}: {err}");
            }
        }
    }

    /// Remove a file row's artifacts: the stored content plus, for photos,
    /// the thumbnail.
    pub fn remove_artifacts(&self, file: &StoredFile) {
        self.remove(&file.file_path);
        if let FileKind::Photo {
            thumb_path: Some(thumb),
            ..
        } = &file.kind
        {
            self.remove(thumb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Incompressible noise image so encoded sizes track raw dimensions.
    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let img = image::RgbImage::from_fn(width, height, |_x, _y| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let v = (seed >> 33) as u32;
            image::Rgb([(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8])
        });
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("png encode");
        out
    }

    fn upload(name: &str, bytes: Vec<u8>) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes,
        }
    }

    fn message(result: Result<(), ApiError>) -> String {
        result.expect_err("expected a validation error").to_string()
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("dir\\sub\\shot.PNG"), "shot.PNG");
        assert_eq!(sanitize_file_name("with spaces & (stuff).webp"), "withspacesstuff.webp");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn rejects_unsupported_extension_first() {
        // A tiny file: extension is checked before size.
        let msg = message(validate_photo(&upload("clip.gif", vec![0u8; 10])));
        assert!(msg.contains("clip.gif"));
        assert!(msg.contains("JPG, PNG and WEBP"));
    }

    #[test]
    fn rejects_undersized_photo() {
        let bytes = noise_png(100, 100);
        assert!(bytes.len() < MIN_IMAGE_SIZE_BYTES);
        let msg = message(validate_photo(&upload("small.png", bytes)));
        assert!(msg.contains("small.png"));
        assert!(msg.contains("250 KiB"));
    }

    #[test]
    fn rejects_narrow_photo() {
        let bytes = noise_png(1200, 300);
        assert!(bytes.len() >= MIN_IMAGE_SIZE_BYTES);
        let msg = message(validate_photo(&upload("narrow.png", bytes)));
        assert!(msg.contains("narrow.png"));
        assert!(msg.contains("2000px"));
    }

    #[test]
    fn rejects_non_image_payload() {
        let msg = message(validate_photo(&upload("fake.jpg", vec![0u8; MIN_IMAGE_SIZE_BYTES])));
        assert!(msg.contains("not recognized as an image"));
    }

    #[test]
    fn accepts_wide_photo() {
        let bytes = noise_png(2200, 200);
        assert!(bytes.len() >= MIN_IMAGE_SIZE_BYTES);
        assert!(validate_photo(&upload("wide.png", bytes)).is_ok());
    }

    #[test]
    fn store_writes_photo_and_thumbnail() {
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("thumbs")).unwrap();
        let store = ContentStore::new(dir.path());

        let stored = store
            .store_photo_batch(7, &[upload("My Photo.png", noise_png(2200, 200))])
            .expect("batch stored");
        assert_eq!(stored.len(), 1);

        let entry = &stored[0];
        assert_eq!(entry.file_name, "MyPhoto.png");
        assert!(entry.file_path.starts_with("uploads/7_"));
        assert!(entry.file_path.ends_with(".png"));

        let on_disk = dir.path().join(entry.file_path.trim_start_matches("uploads/"));
        assert!(on_disk.exists());

        let thumb_rel = entry.thumb_path.as_ref().expect("thumbnail generated");
        let thumb_name = thumb_rel.rsplit('/').next().unwrap();
        let thumb_bytes = std::fs::read(dir.path().join("thumbs").join(thumb_name)).unwrap();
        let thumb = image::load_from_memory(&thumb_bytes).expect("thumbnail decodes");
        assert!(thumb.width() <= THUMB_MAX_PX && thumb.height() <= THUMB_MAX_PX);
    }

    #[test]
    fn failing_batch_leaves_no_artifacts() {
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("thumbs")).unwrap();
        let store = ContentStore::new(dir.path());

        let result = store.store_photo_batch(
            3,
            &[
                upload("ok.png", noise_png(2200, 200)),
                upload("bad.gif", vec![0u8; 10]),
            ],
        );
        assert!(result.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn remove_ignores_missing_files() {
        let dir = tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());
        store.remove("uploads/not_there.jpg");
        store.remove("uploads/thumbs/not_there_thumb.jpg");
        store.remove("");
    }

    #[test]
    fn originals_are_stored_without_thumbnails() {
        let dir = tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());

        let stored = store
            .store_original_batch(2, &[upload("shot.dng", vec![1u8; 64])])
            .expect("original stored");
        assert_eq!(stored.len(), 1);
        assert!(stored[0].thumb_path.is_none());
        assert!(stored[0].file_path.ends_with(".dng"));
    }
}
