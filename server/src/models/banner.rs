// server/src/models/banner.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Banner {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub image_url: String,
  pub link_url: String,
  pub is_active: bool,
  #[serde(rename = "order")]
  pub display_order: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
