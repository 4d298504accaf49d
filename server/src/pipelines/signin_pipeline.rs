// server/src/pipelines/signin_pipeline.rs

use crate::db;
use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service::{self, INVALID_CREDENTIALS};
use crate::state::AppState;
use chrono::{Duration, Utc};
use lokanta_flow::{ContextData, Pipeline, PipelineControl, Registry};
use std::sync::Arc;
use tracing::{info, warn};

fn invalid_credentials() -> AppError {
  AppError::Auth(INVALID_CREDENTIALS.to_string())
}

/// Registers the credential login pipeline used by both the user and the admin flow.
pub fn register_signin_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("load_account_signin", false, None),
    ("verify_password_signin", false, None),
    ("issue_session_signin", false, None),
  ]);

  p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let missing = ctx_data.snapshot(|c| c.email.trim().is_empty() || c.password.is_empty());
      if missing {
        return Err(AppError::Validation("Email and password are required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("load_account_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, admin_only, pool) =
        ctx_data.snapshot(|c| (c.email.clone(), c.admin_only, c.app_state.db_pool.clone()));

      let user = db::users::find_by_email(&pool, &email).await?.ok_or_else(|| {
        warn!(%email, "Login for unknown email.");
        invalid_credentials()
      })?;
      if admin_only && !user.is_admin() {
        warn!(user_id = user.id, "Non-admin account attempted the admin login.");
        return Err(invalid_credentials());
      }

      ctx_data.write().user = Some(user);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("verify_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (hash, password, user_id) = ctx_data.snapshot(|c| {
        (
          c.user.as_ref().map(|u| u.password_hash.clone()),
          c.password.clone(),
          c.user.as_ref().map(|u| u.id),
        )
      });
      let hash = hash.ok_or_else(|| AppError::Internal("Account not loaded before password check.".to_string()))?;

      if !auth_service::verify_password(&hash, &password)? {
        warn!(?user_id, "Password mismatch on login.");
        return Err(invalid_credentials());
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("issue_session_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (user_id, pool, ttl_hours) = ctx_data.snapshot(|c| {
        (
          c.user.as_ref().map(|u| u.id),
          c.app_state.db_pool.clone(),
          c.app_state.config.session_ttl_hours,
        )
      });
      let user_id = user_id.ok_or_else(|| AppError::Internal("Account not loaded before issuing session.".to_string()))?;

      let token = auth_service::generate_session_token();
      let session = db::sessions::create(&pool, &token, user_id, Utc::now() + Duration::hours(ttl_hours)).await?;
      info!(user_id, expires_at = %session.expires_at, "Session issued.");

      ctx_data.update(|c| {
        c.session_token = Some(session.token);
        c.expires_at = Some(session.expires_at);
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Sign-in pipeline registered.");
}
