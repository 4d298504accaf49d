// server/src/web/extractors.rs

//! Request guards resolving the bearer session token to a user.

use crate::db;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.trim().split_once(' ')?;
  let token = token.trim();
  if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
    return None;
  }
  Some(token.to_string())
}

fn login_required() -> AppError {
  AppError::Auth("You must be logged in.".to_string())
}

async fn resolve_session(app_state: &AppState, token: &str) -> Result<Option<User>, AppError> {
  let Some(session) = db::sessions::find(&app_state.db_pool, token).await? else {
    return Ok(None);
  };
  if session.is_expired(Utc::now()) {
    debug!(user_id = session.user_id, "Expired session presented; removing it.");
    db::sessions::delete(&app_state.db_pool, token).await?;
    return Ok(None);
  }
  db::users::find_by_id(&app_state.db_pool, session.user_id).await
}

fn app_state_of(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .cloned()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))
}

/// Any logged-in user. Missing or unknown tokens are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = bearer_token(req);
    let app_state = app_state_of(req);
    Box::pin(async move {
      let token = token.ok_or_else(login_required)?;
      let app_state = app_state?;
      match resolve_session(&app_state, &token).await? {
        Some(user) => Ok(AuthenticatedUser(user)),
        None => {
          warn!("Request with an invalid or expired session token.");
          Err(login_required())
        }
      }
    })
  }
}

/// A logged-in user with the `admin` role; other users get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let AuthenticatedUser(user) = authenticated.await?;
      if !user.is_admin() {
        warn!(user_id = user.id, "Non-admin attempted an admin operation.");
        return Err(AppError::Forbidden("Admin access required.".to_string()));
      }
      Ok(AdminUser(user))
    })
  }
}

/// The caller if a valid session was presented. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = bearer_token(req);
    let app_state = app_state_of(req);
    Box::pin(async move {
      let (Some(token), Ok(app_state)) = (token, app_state) else {
        return Ok(MaybeUser(None));
      };
      match resolve_session(&app_state, &token).await {
        Ok(user) => Ok(MaybeUser(user)),
        Err(e) => {
          warn!(error = %e, "Optional session lookup failed; continuing anonymously.");
          Ok(MaybeUser(None))
        }
      }
    })
  }
}
