// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db;
use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::{bearer_token, AuthenticatedUser};
use lokanta_flow::{ContextData, PipelineResult};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequestPayload {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

// --- Handlers ---

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let signup_ctx_initial = SignupCtxData {
    app_state: app_state.get_ref().clone(),
    first_name: payload.first_name,
    last_name: payload.last_name,
    email: auth_service::normalize_email(&payload.email),
    phone: payload.phone,
    address: payload.address,
    password: payload.password,
    created_user: None,
    welcome_email_sent: false,
  };
  let ctx_data = ContextData::new(signup_ctx_initial);

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user_id, email_sent) = ctx_data.snapshot(|c| (c.created_user.as_ref().map(|u| u.id), c.welcome_email_sent));
      let user_id = user_id.ok_or_else(|| {
        warn!("Signup pipeline completed but no user was set in context.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      info!(user_id, email_sent, "Registration successful.");
      Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully.",
        "userId": user_id,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

async fn run_signin(app_state: &AppState, payload: LoginRequestPayload, admin_only: bool) -> Result<HttpResponse, AppError> {
  let signin_ctx_initial = SigninCtxData {
    app_state: app_state.clone(),
    email: auth_service::normalize_email(&payload.email),
    password: payload.password,
    admin_only,
    user: None,
    session_token: None,
    expires_at: None,
  };
  let ctx_data = ContextData::new(signin_ctx_initial);

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user, token, expires_at) = ctx_data.snapshot(|c| (c.user.clone(), c.session_token.clone(), c.expires_at));
      let (Some(user), Some(token), Some(expires_at)) = (user, token, expires_at) else {
        warn!("Signin pipeline completed without a session.");
        return Err(AppError::Auth("Signin completed without session token generation.".to_string()));
      };
      info!(user_id = user.id, admin_only, "Signin successful.");
      Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "expiresAt": expires_at,
        "user": {
          "id": user.id,
          "email": user.email,
          "name": user.full_name(),
          "role": user.role,
        },
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signin pipeline was stopped by a handler.");
      Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  run_signin(app_state.get_ref(), req_payload.into_inner(), false).await
}

#[instrument(name = "handler::admin_login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn admin_login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  run_signin(app_state.get_ref(), req_payload.into_inner(), true).await
}

#[instrument(name = "handler::logout", skip_all, fields(user_id = auth_user.0.id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  if let Some(token) = bearer_token(&req) {
    db::sessions::delete(&app_state.db_pool, &token).await?;
  }
  info!("Session ended.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Logged out." })))
}
