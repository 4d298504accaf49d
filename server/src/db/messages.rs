// server/src/db/messages.rs

use crate::errors::Result as AppResult;
use crate::models::message::{DirectMessage, ForumMessage, UnreadCount};
use sqlx::PgPool;

pub const FORUM_PAGE: i64 = 50;

const FORUM_SELECT: &str = "SELECT f.id, f.author_id, f.message, f.image_path, f.created_at, \
  u.first_name AS author_first_name, u.last_name AS author_last_name, u.email AS author_email \
  FROM forum_messages f JOIN users u ON u.id = f.author_id";

const DIRECT_SELECT: &str = "SELECT d.id, d.sender_id, d.receiver_id, d.message, d.image_path, d.is_read, d.created_at, \
  u.first_name AS sender_first_name, u.last_name AS sender_last_name \
  FROM direct_messages d JOIN users u ON u.id = d.sender_id";

/// Latest forum messages, oldest first.
pub async fn recent_forum(pool: &PgPool) -> AppResult<Vec<ForumMessage>> {
  let mut rows = sqlx::query_as::<_, ForumMessage>(&format!(
    "{} ORDER BY f.created_at DESC, f.id DESC LIMIT $1",
    FORUM_SELECT
  ))
  .bind(FORUM_PAGE)
  .fetch_all(pool)
  .await?;
  rows.reverse();
  Ok(rows)
}

pub async fn insert_forum(
  pool: &PgPool,
  author_id: i64,
  message: Option<&str>,
  image_path: Option<&str>,
) -> AppResult<ForumMessage> {
  let id = sqlx::query_scalar::<_, i64>(
    "INSERT INTO forum_messages (author_id, message, image_path) VALUES ($1, $2, $3) RETURNING id",
  )
  .bind(author_id)
  .bind(message)
  .bind(image_path)
  .fetch_one(pool)
  .await?;

  let row = sqlx::query_as::<_, ForumMessage>(&format!("{} WHERE f.id = $1", FORUM_SELECT))
    .bind(id)
    .fetch_one(pool)
    .await?;
  Ok(row)
}

/// The two-party thread in creation order. Messages sent to `reader_id` are
/// marked read in the same transaction; the returned rows reflect that.
pub async fn read_thread(pool: &PgPool, reader_id: i64, other_id: i64) -> AppResult<Vec<DirectMessage>> {
  let mut tx = pool.begin().await?;
  sqlx::query("UPDATE direct_messages SET is_read = TRUE WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read")
    .bind(reader_id)
    .bind(other_id)
    .execute(&mut *tx)
    .await?;
  let rows = sqlx::query_as::<_, DirectMessage>(&format!(
    "{} WHERE (d.sender_id = $1 AND d.receiver_id = $2) OR (d.sender_id = $2 AND d.receiver_id = $1) \
     ORDER BY d.created_at, d.id",
    DIRECT_SELECT
  ))
  .bind(reader_id)
  .bind(other_id)
  .fetch_all(&mut *tx)
  .await?;
  tx.commit().await?;
  Ok(rows)
}

pub async fn insert_direct(
  pool: &PgPool,
  sender_id: i64,
  receiver_id: i64,
  message: Option<&str>,
  image_path: Option<&str>,
) -> AppResult<DirectMessage> {
  let id = sqlx::query_scalar::<_, i64>(
    "INSERT INTO direct_messages (sender_id, receiver_id, message, image_path) VALUES ($1, $2, $3, $4) RETURNING id",
  )
  .bind(sender_id)
  .bind(receiver_id)
  .bind(message)
  .bind(image_path)
  .fetch_one(pool)
  .await?;

  let row = sqlx::query_as::<_, DirectMessage>(&format!("{} WHERE d.id = $1", DIRECT_SELECT))
    .bind(id)
    .fetch_one(pool)
    .await?;
  Ok(row)
}

pub async fn unread_counts(pool: &PgPool, receiver_id: i64) -> AppResult<Vec<UnreadCount>> {
  let rows = sqlx::query_as::<_, UnreadCount>(
    "SELECT sender_id, COUNT(*) AS count FROM direct_messages \
     WHERE receiver_id = $1 AND NOT is_read GROUP BY sender_id ORDER BY sender_id",
  )
  .bind(receiver_id)
  .fetch_all(pool)
  .await?;
  Ok(rows)
}
