// server/src/services/uploads.rs

//! Image uploads stored under a month-bucketed directory.

use crate::errors::{AppError, Result as AppResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_TYPES: [(&str, &str); 4] = [
  ("image/jpeg", "jpeg"),
  ("image/png", "png"),
  ("image/gif", "gif"),
  ("image/webp", "webp"),
];

pub fn extension_for(content_type: &str) -> Option<&'static str> {
  let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
  ALLOWED_TYPES
    .iter()
    .find(|(mime, _)| *mime == essence)
    .map(|(_, ext)| *ext)
}

pub fn validate(content_type: Option<&str>, size: usize) -> AppResult<&'static str> {
  let ext = content_type.and_then(extension_for).ok_or_else(|| {
    AppError::Validation("Unsupported file type. Only JPG, PNG, GIF and WEBP are allowed.".to_string())
  })?;
  if size > MAX_UPLOAD_BYTES {
    return Err(AppError::Validation("File size cannot exceed 5MB.".to_string()));
  }
  Ok(ext)
}

/// Returns `(directory relative to the upload root, file name)`.
pub fn upload_location(now: DateTime<Utc>, id: Uuid, ext: &str) -> (String, String) {
  (now.format("%Y-%m").to_string(), format!("{}.{}", id, ext))
}

/// Writes `bytes` and returns the public path, e.g. `/uploads/2024-06/<uuid>.png`.
#[instrument(name = "uploads::store", skip(bytes), fields(size = bytes.len()))]
pub async fn store(upload_root: &Path, ext: &str, bytes: &[u8], now: DateTime<Utc>) -> AppResult<String> {
  let (month_dir, file_name) = upload_location(now, Uuid::new_v4(), ext);
  let dir: PathBuf = upload_root.join(&month_dir);
  tokio::fs::create_dir_all(&dir)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;
  tokio::fs::write(dir.join(&file_name), bytes)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to write upload: {}", e)))?;

  let public_path = format!("/uploads/{}/{}", month_dir, file_name);
  info!(%public_path, "Upload stored.");
  Ok(public_path)
}
