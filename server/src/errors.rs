// server/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use lokanta_flow::FlowError;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// `detail` must be a JSON object; its fields are merged into the response body.
  #[error("Conflict: {message}")]
  Conflict { message: String, detail: JsonValue },

  #[error("Payment Error: {0}")]
  Payment(String),

  #[error("Payment Provider Error: {0}")]
  PaymentProvider(String),

  #[error("Email Error: {0}")]
  Email(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl AppError {
  pub fn conflict(message: impl Into<String>, detail: JsonValue) -> Self {
    AppError::Conflict {
      message: message.into(),
      detail,
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    AppError::PaymentProvider(err.to_string())
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict { .. } | AppError::PipelineHaltedByHandler => StatusCode::CONFLICT,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
      AppError::Email(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }

    let body = match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
        json!({ "error": m })
      }
      AppError::Conflict { message, detail } => {
        let mut body = json!({ "error": message });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), detail.as_object()) {
          for (key, value) in extra {
            target.insert(key.clone(), value.clone());
          }
        }
        body
      }
      AppError::Payment(m) => json!({ "error": m }),
      AppError::PaymentProvider(m) => json!({ "error": "Payment provider error", "detail": m }),
      AppError::Email(m) => json!({ "error": "Email service error", "detail": m }),
      AppError::Config(m) => json!({ "error": "Configuration issue", "detail": m }),
      AppError::Sqlx(_) => json!({ "error": "Database operation failed" }),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({ "error": "Workflow processing error" })
      }
      AppError::Internal(m) => json!({ "error": "An internal error occurred", "detail": m }),
      AppError::PipelineHaltedByHandler => json!({ "error": "Process halted by business logic." }),
    };

    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
