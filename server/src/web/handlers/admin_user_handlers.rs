// server/src/web/handlers/admin_user_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::user::{NewUser, UserRole};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
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
  #[serde(default)]
  pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RolePayload {
  #[serde(default)]
  pub role: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
  #[serde(default)]
  pub current_password: String,
  #[serde(default)]
  pub new_password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailPayload {
  #[serde(default)]
  pub current_password: String,
  #[serde(default)]
  pub new_email: String,
}

fn parse_role(raw: &str) -> Result<UserRole, AppError> {
  UserRole::parse(raw).ok_or_else(|| AppError::Validation("Invalid role.".to_string()))
}

#[instrument(name = "handler::admin_list_users", skip_all, fields(admin_id = admin.0.id))]
pub async fn list_users_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let users = db::users::list_all(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(users))
}

#[instrument(name = "handler::admin_create_user", skip_all, fields(admin_id = admin.0.id, req_email = %req_payload.email))]
pub async fn create_user_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<CreateUserPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let email = auth_service::normalize_email(&payload.email);
  if payload.first_name.trim().is_empty()
    || payload.last_name.trim().is_empty()
    || email.is_empty()
    || payload.password.is_empty()
  {
    return Err(AppError::Validation("First name, last name, email and password are required.".to_string()));
  }
  if !auth_service::is_valid_email(&email) {
    return Err(AppError::Validation("Please enter a valid email address.".to_string()));
  }
  let role = match payload.role.as_deref() {
    Some(raw) if !raw.trim().is_empty() => parse_role(raw)?,
    _ => UserRole::User,
  };

  let new_user = NewUser {
    first_name: payload.first_name.trim().to_string(),
    last_name: payload.last_name.trim().to_string(),
    email,
    phone: payload.phone.trim().to_string(),
    address: payload.address.trim().to_string(),
    password_hash: auth_service::hash_password(&payload.password)?,
    role,
  };
  let user = match db::users::insert(&app_state.db_pool, &new_user).await {
    Ok(user) => user,
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::conflict("An account with this email already exists.", json!({})));
    }
    Err(e) => return Err(e.into()),
  };
  info!(user_id = user.id, role = ?user.role, "User created by admin.");
  Ok(HttpResponse::Created().json(user))
}

#[instrument(name = "handler::admin_update_role", skip_all, fields(admin_id = admin.0.id, target_id = *path))]
pub async fn update_role_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<RolePayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == admin.0.id {
    return Err(AppError::Validation("You cannot change your own admin status.".to_string()));
  }
  let role = parse_role(&req_payload.role)?;
  let user = db::users::update_role(&app_state.db_pool, user_id, role)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
  info!(role = ?user.role, "User role changed.");
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::admin_delete_user", skip_all, fields(admin_id = admin.0.id, target_id = *path))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == admin.0.id {
    return Err(AppError::Validation("You cannot delete your own account.".to_string()));
  }
  if !db::users::delete(&app_state.db_pool, user_id).await? {
    return Err(AppError::NotFound("User not found.".to_string()));
  }
  info!("User deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "User deleted." })))
}

#[instrument(name = "handler::admin_change_password", skip_all, fields(admin_id = admin.0.id))]
pub async fn change_password_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<ChangePasswordPayload>,
) -> Result<HttpResponse, AppError> {
  let AdminUser(admin_user) = admin;
  if req_payload.current_password.is_empty() || req_payload.new_password.is_empty() {
    return Err(AppError::Validation("Required fields are missing.".to_string()));
  }
  if !auth_service::verify_password(&admin_user.password_hash, &req_payload.current_password)? {
    warn!("Admin password change with a wrong current password.");
    return Err(AppError::Validation("Current password is incorrect.".to_string()));
  }
  let hash = auth_service::hash_password(&req_payload.new_password)?;
  db::users::update_password(&app_state.db_pool, admin_user.id, &hash).await?;
  let revoked = db::sessions::delete_for_user(&app_state.db_pool, admin_user.id).await?;
  info!(revoked, "Admin password changed; sessions revoked.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Password updated.", "requireRelogin": true })))
}

#[instrument(name = "handler::admin_change_email", skip_all, fields(admin_id = admin.0.id))]
pub async fn change_email_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<ChangeEmailPayload>,
) -> Result<HttpResponse, AppError> {
  let AdminUser(admin_user) = admin;
  let new_email = auth_service::normalize_email(&req_payload.new_email);
  if req_payload.current_password.is_empty() || new_email.is_empty() {
    return Err(AppError::Validation("Required fields are missing.".to_string()));
  }
  if !auth_service::is_valid_email(&new_email) {
    return Err(AppError::Validation("Please enter a valid email address.".to_string()));
  }
  if !auth_service::verify_password(&admin_user.password_hash, &req_payload.current_password)? {
    warn!("Admin email change with a wrong current password.");
    return Err(AppError::Validation("Current password is incorrect.".to_string()));
  }
  let pool = &app_state.db_pool;
  if db::users::email_taken(pool, &new_email, Some(admin_user.id)).await? {
    return Err(AppError::Validation("This email is already in use.".to_string()));
  }
  match db::users::update_email(pool, admin_user.id, &new_email).await {
    Ok(()) => {}
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::Validation("This email is already in use.".to_string()));
    }
    Err(e) => return Err(e.into()),
  }
  let revoked = db::sessions::delete_for_user(pool, admin_user.id).await?;
  info!(revoked, "Admin email changed; sessions revoked.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Email updated.", "requireRelogin": true })))
}
