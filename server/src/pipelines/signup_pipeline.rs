// server/src/pipelines/signup_pipeline.rs

use crate::db;
use crate::errors::AppError;
use crate::models::user::{NewUser, UserRole};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use lokanta_flow::{ContextData, Pipeline, PipelineControl, Registry};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the account registration pipeline.
pub fn register_signup_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user_signup", false, None),
    ("create_user_in_db", false, None),
    ("send_welcome_email_signup", true, None),
  ]);

  p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let required = [
        &guard.first_name,
        &guard.last_name,
        &guard.email,
        &guard.phone,
        &guard.address,
        &guard.password,
      ];
      if required.iter().any(|v| v.trim().is_empty()) {
        return Err(AppError::Validation("All fields are required.".to_string()));
      }
      if !auth_service::is_valid_email(&guard.email) {
        warn!(email = %guard.email, "Registration with malformed email.");
        return Err(AppError::Validation("Please enter a valid email address.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("check_existing_user_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, pool) = ctx_data.snapshot(|c| (c.email.clone(), c.app_state.db_pool.clone()));
      event!(Level::DEBUG, %email, "Checking if user email already exists.");
      if db::users::email_taken(&pool, &email, None).await? {
        warn!(%email, "Attempt to register an existing email.");
        return Err(AppError::conflict(
          "An account with this email already exists.",
          serde_json::json!({}),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_user_in_db", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (new_user, password, pool) = ctx_data.snapshot(|c| {
        (
          NewUser {
            first_name: c.first_name.trim().to_string(),
            last_name: c.last_name.trim().to_string(),
            email: c.email.clone(),
            phone: c.phone.trim().to_string(),
            address: c.address.trim().to_string(),
            password_hash: String::new(),
            role: UserRole::User,
          },
          c.password.clone(),
          c.app_state.db_pool.clone(),
        )
      });

      let new_user = NewUser {
        password_hash: auth_service::hash_password(&password)?,
        ..new_user
      };

      let user = match db::users::insert(&pool, &new_user).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration for the same email.
        Err(e) if db::is_unique_violation(&e) => {
          return Err(AppError::conflict(
            "An account with this email already exists.",
            serde_json::json!({}),
          ))
        }
        Err(e) => {
          event!(Level::ERROR, error = %e, "Database error while creating user.");
          return Err(AppError::Sqlx(e));
        }
      };

      info!(user_id = user.id, email = %user.email, "User registered.");
      ctx_data.write().created_user = Some(user);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("send_welcome_email_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (app_state, user) = ctx_data.snapshot(|c| (c.app_state.clone(), c.created_user.clone()));
      let Some(user) = user else {
        warn!("Welcome email skipped: no user in signup context.");
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      let sent = common_steps::send_welcome_email(&app_state, &user.email, &user.first_name).await;
      ctx_data.write().welcome_email_sent = sent;
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Sign-up pipeline registered.");
}
