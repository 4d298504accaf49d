// server/src/models/message.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForumMessage {
  pub id: i64,
  pub author_id: i64,
  pub message: Option<String>,
  pub image_path: Option<String>,
  pub created_at: DateTime<Utc>,
  pub author_first_name: String,
  pub author_last_name: String,
  pub author_email: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DirectMessage {
  pub id: i64,
  pub sender_id: i64,
  pub receiver_id: i64,
  pub message: Option<String>,
  pub image_path: Option<String>,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
  pub sender_first_name: String,
  pub sender_last_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UnreadCount {
  pub sender_id: i64,
  pub count: i64,
}
