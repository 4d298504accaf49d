// server/src/models/temp_order.rs

use crate::models::order::CustomerInfo;
use crate::services::discount_engine::CartLine;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Staged checkout bridging session creation and payment confirmation.
#[derive(Debug, Clone, FromRow)]
pub struct TempOrder {
  pub id: Uuid,
  pub customer_info: Json<CustomerInfo>,
  pub cart_items: Json<Vec<CartLine>>,
  pub discount_code: Option<String>,
  pub user_id: Option<i64>,
  pub total_cents: i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl TempOrder {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
