// server/src/db/sessions.rs

use crate::errors::Result as AppResult;
use crate::models::session::Session;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn create(pool: &PgPool, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> AppResult<Session> {
  let session = sqlx::query_as::<_, Session>(
    "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) \
     RETURNING token, user_id, created_at, expires_at",
  )
  .bind(token)
  .bind(user_id)
  .bind(expires_at)
  .fetch_one(pool)
  .await?;
  Ok(session)
}

pub async fn find(pool: &PgPool, token: &str) -> AppResult<Option<Session>> {
  let session = sqlx::query_as::<_, Session>(
    "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
  )
  .bind(token)
  .fetch_optional(pool)
  .await?;
  Ok(session)
}

pub async fn delete(pool: &PgPool, token: &str) -> AppResult<bool> {
  let result = sqlx::query("DELETE FROM sessions WHERE token = $1").bind(token).execute(pool).await?;
  Ok(result.rows_affected() > 0)
}

pub async fn delete_for_user(pool: &PgPool, user_id: i64) -> AppResult<u64> {
  let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected())
}

pub async fn delete_expired(pool: &PgPool, now: DateTime<Utc>) -> AppResult<u64> {
  let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
    .bind(now)
    .execute(pool)
    .await?;
  Ok(result.rows_affected())
}
