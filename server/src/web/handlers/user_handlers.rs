// server/src/web/handlers/user_handlers.rs

//! Self-service profile endpoints for the logged-in user.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db;
use crate::db::users::ProfileUpdate;
use crate::errors::AppError;
use crate::models::user::User;
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct UpdateProfilePayload {
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default, rename = "currentPassword")]
  pub current_password: Option<String>,
  #[serde(default, rename = "newPassword")]
  pub new_password: Option<String>,
}

fn profile_json(user: &User) -> serde_json::Value {
  json!({
    "id": user.id,
    "email": user.email,
    "name": user.full_name(),
    "first_name": user.first_name,
    "last_name": user.last_name,
    "phone": user.phone,
    "address": user.address,
    "role": user.role,
  })
}

/// A submitted value, or the current one when blank or absent.
fn keep_or_replace(submitted: Option<String>, current: &str) -> String {
  submitted
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .unwrap_or_else(|| current.to_string())
}

#[instrument(name = "handler::user_info", skip_all, fields(user_id = auth_user.0.id))]
pub async fn user_info_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let AuthenticatedUser(user) = auth_user;
  Ok(HttpResponse::Ok().json(json!({ "user": profile_json(&user) })))
}

#[instrument(name = "handler::user_update", skip_all, fields(user_id = auth_user.0.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<UpdateProfilePayload>,
) -> Result<HttpResponse, AppError> {
  let AuthenticatedUser(user) = auth_user;
  let payload = req_payload.into_inner();
  let pool = &app_state.db_pool;

  let requested_email = payload
    .email
    .as_deref()
    .map(auth_service::normalize_email)
    .filter(|e| !e.is_empty());
  let email_changed = requested_email.as_deref().is_some_and(|e| e != user.email);
  if email_changed {
    let email = requested_email.as_deref().unwrap_or_default();
    if !auth_service::is_valid_email(email) {
      return Err(AppError::Validation("Please enter a valid email address.".to_string()));
    }
    if db::users::email_taken(pool, email, Some(user.id)).await? {
      return Err(AppError::Validation("This email is already in use.".to_string()));
    }
  }

  let new_password = payload.new_password.filter(|p| !p.is_empty());
  let password_hash = match new_password {
    Some(new_password) => {
      let current = payload.current_password.unwrap_or_default();
      if current.is_empty() || !auth_service::verify_password(&user.password_hash, &current)? {
        warn!("Profile password change with a wrong current password.");
        return Err(AppError::Validation("Current password is incorrect.".to_string()));
      }
      Some(auth_service::hash_password(&new_password)?)
    }
    None => None,
  };
  let password_changed = password_hash.is_some();

  let update = ProfileUpdate {
    first_name: keep_or_replace(payload.first_name, &user.first_name),
    last_name: keep_or_replace(payload.last_name, &user.last_name),
    phone: keep_or_replace(payload.phone, &user.phone),
    address: keep_or_replace(payload.address, &user.address),
    email: requested_email.unwrap_or_else(|| user.email.clone()),
    password_hash,
  };
  let updated = match db::users::update_profile(pool, user.id, &update).await {
    Ok(Some(updated)) => updated,
    Ok(None) => return Err(AppError::NotFound("User not found.".to_string())),
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::Validation("This email is already in use.".to_string()));
    }
    Err(e) => return Err(e.into()),
  };

  let require_relogin = email_changed || password_changed;
  if require_relogin {
    let revoked = db::sessions::delete_for_user(pool, user.id).await?;
    info!(revoked, email_changed, password_changed, "Credentials changed; sessions revoked.");
  }

  Ok(HttpResponse::Ok().json(json!({
    "message": "Profile updated.",
    "user": profile_json(&updated),
    "requireRelogin": require_relogin,
  })))
}

#[instrument(name = "handler::user_orders", skip_all, fields(user_id = auth_user.0.id))]
pub async fn user_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = db::orders::list_for_user(&app_state.db_pool, auth_user.0.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::users_list", skip_all, fields(user_id = auth_user.0.id))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let users = db::users::list_others(&app_state.db_pool, auth_user.0.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_profile_fields_keep_current_values() {
    assert_eq!(keep_or_replace(None, "Ayşe"), "Ayşe");
    assert_eq!(keep_or_replace(Some("   ".into()), "Ayşe"), "Ayşe");
    assert_eq!(keep_or_replace(Some(" Fatma ".into()), "Ayşe"), "Fatma");
  }
}
