// server/src/db/users.rs

use crate::errors::Result as AppResult;
use crate::models::user::{NewUser, User, UserRole, UserSummary};
use sqlx::PgPool;

const USER_COLUMNS: &str =
  "id, first_name, last_name, email, phone, address, password_hash, role, created_at, updated_at";

/// Contact fields a user may change on their own profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub address: String,
  pub email: String,
  pub password_hash: Option<String>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<User>> {
  let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
  let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
    .bind(email)
    .fetch_optional(pool)
    .await?;
  Ok(user)
}

/// True when `email` belongs to any account other than `except_id`.
pub async fn email_taken(pool: &PgPool, email: &str, except_id: Option<i64>) -> AppResult<bool> {
  let taken = sqlx::query_scalar::<_, bool>(
    "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
  )
  .bind(email)
  .bind(except_id)
  .fetch_one(pool)
  .await?;
  Ok(taken)
}

pub async fn insert(pool: &PgPool, new_user: &NewUser) -> Result<User, sqlx::Error> {
  sqlx::query_as::<_, User>(&format!(
    "INSERT INTO users (first_name, last_name, email, phone, address, password_hash, role) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    USER_COLUMNS
  ))
  .bind(&new_user.first_name)
  .bind(&new_user.last_name)
  .bind(&new_user.email)
  .bind(&new_user.phone)
  .bind(&new_user.address)
  .bind(&new_user.password_hash)
  .bind(new_user.role)
  .fetch_one(pool)
  .await
}

pub async fn list_all(pool: &PgPool) -> AppResult<Vec<User>> {
  let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY created_at DESC, id DESC", USER_COLUMNS))
    .fetch_all(pool)
    .await?;
  Ok(users)
}

/// Directory of everyone except `user_id`.
pub async fn list_others(pool: &PgPool, user_id: i64) -> AppResult<Vec<UserSummary>> {
  let users = sqlx::query_as::<_, UserSummary>(
    "SELECT id, first_name, last_name, email FROM users WHERE id <> $1 ORDER BY first_name, last_name, id",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(users)
}

pub async fn update_profile(pool: &PgPool, id: i64, update: &ProfileUpdate) -> Result<Option<User>, sqlx::Error> {
  sqlx::query_as::<_, User>(&format!(
    "UPDATE users SET first_name = $2, last_name = $3, phone = $4, address = $5, email = $6, \
     password_hash = COALESCE($7, password_hash), updated_at = NOW() \
     WHERE id = $1 RETURNING {}",
    USER_COLUMNS
  ))
  .bind(id)
  .bind(&update.first_name)
  .bind(&update.last_name)
  .bind(&update.phone)
  .bind(&update.address)
  .bind(&update.email)
  .bind(update.password_hash.as_deref())
  .fetch_optional(pool)
  .await
}

pub async fn update_role(pool: &PgPool, id: i64, role: UserRole) -> AppResult<Option<User>> {
  let user = sqlx::query_as::<_, User>(&format!(
    "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
    USER_COLUMNS
  ))
  .bind(id)
  .bind(role)
  .fetch_optional(pool)
  .await?;
  Ok(user)
}

pub async fn update_password(pool: &PgPool, id: i64, password_hash: &str) -> AppResult<()> {
  sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn update_email(pool: &PgPool, id: i64, email: &str) -> Result<(), sqlx::Error> {
  sqlx::query("UPDATE users SET email = $2, updated_at = NOW() WHERE id = $1")
    .bind(id)
    .bind(email)
    .execute(pool)
    .await?;
  Ok(())
}

/// Returns false when no such user exists.
pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
  let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() > 0)
}

pub async fn all_emails(pool: &PgPool) -> AppResult<Vec<String>> {
  let emails = sqlx::query_scalar::<_, String>("SELECT email FROM users ORDER BY id")
    .fetch_all(pool)
    .await?;
  Ok(emails)
}
