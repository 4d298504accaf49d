// server/src/services/auth_service.rs

//! Password hashing, session tokens and credential checks.

use crate::config::AppConfig;
use crate::db;
use crate::errors::AppError;
use crate::models::user::{NewUser, User, UserRole};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use rand_core::RngCore;
use sqlx::PgPool;
use std::fmt::Write as _;
use tracing::{debug, error, info, instrument};

/// Message used for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Hashes a plain-text password using Argon2 with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// Returns `Ok(false)` on a mismatch. A malformed stored hash is an internal
/// error, not an authentication failure.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

/// 256 random bits, hex encoded.
pub fn generate_session_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
    let _ = write!(acc, "{:02x}", b);
    acc
  })
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  match domain.rsplit_once('.') {
    Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
    None => false,
  }
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

/// Creates the configured bootstrap admin unless an account with that email exists.
#[instrument(name = "auth_service::ensure_bootstrap_admin", skip_all)]
pub async fn ensure_bootstrap_admin(pool: &PgPool, config: &AppConfig) -> Result<Option<User>, AppError> {
  let (Some(email), Some(password)) = (&config.admin_bootstrap_email, &config.admin_bootstrap_password) else {
    debug!("No bootstrap admin configured.");
    return Ok(None);
  };
  let email = normalize_email(email);
  if db::users::find_by_email(pool, &email).await?.is_some() {
    debug!(%email, "Bootstrap admin already present.");
    return Ok(None);
  }
  let admin = db::users::insert(
    pool,
    &NewUser {
      first_name: "Admin".to_string(),
      last_name: String::new(),
      email,
      phone: String::new(),
      address: String::new(),
      password_hash: hash_password(password)?,
      role: UserRole::Admin,
    },
  )
  .await?;
  info!(user_id = admin.id, email = %admin.email, "Bootstrap admin created.");
  Ok(Some(admin))
}
