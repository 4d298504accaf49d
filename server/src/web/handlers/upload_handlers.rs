// server/src/web/handlers/upload_handlers.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::uploads::{self, MAX_UPLOAD_BYTES};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const FILE_FIELD: &str = "file";

fn malformed(e: actix_multipart::MultipartError) -> AppError {
  AppError::Validation(format!("Malformed upload: {}", e))
}

/// Accepts one image in the `file` field and stores it under the upload root.
#[instrument(name = "handler::upload", skip_all, fields(user_id = auth_user.0.id))]
pub async fn upload_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
  while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
    if field.name() != Some(FILE_FIELD) {
      continue;
    }
    let content_type = field.content_type().map(|m| m.essence_str().to_string());
    // Reject the type before reading the body.
    uploads::validate(content_type.as_deref(), 0)?;

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
      if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
        warn!("Upload exceeds the size limit.");
        return Err(AppError::Validation("File size cannot exceed 5MB.".to_string()));
      }
      bytes.extend_from_slice(&chunk);
    }

    let ext = uploads::validate(content_type.as_deref(), bytes.len())?;
    let file_path = uploads::store(&app_state.config.upload_dir, ext, &bytes, Utc::now()).await?;
    info!(%file_path, size = bytes.len(), "File uploaded.");
    return Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "filePath": file_path,
      "message": "File uploaded successfully.",
    })));
  }
  Err(AppError::Validation("No file was sent.".to_string()))
}
