// server/src/db/temp_orders.rs

use crate::errors::Result as AppResult;
use crate::models::order::CustomerInfo;
use crate::models::temp_order::TempOrder;
use crate::services::discount_engine::CartLine;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const TEMP_ORDER_COLUMNS: &str =
  "id, customer_info, cart_items, discount_code, user_id, total_cents, created_at, expires_at";

#[derive(Debug, Clone)]
pub struct NewTempOrder {
  pub id: Uuid,
  pub customer: CustomerInfo,
  pub cart: Vec<CartLine>,
  pub discount_code: Option<String>,
  pub user_id: Option<i64>,
  pub total_cents: i64,
  pub expires_at: DateTime<Utc>,
}

pub async fn insert(pool: &PgPool, new: &NewTempOrder) -> AppResult<TempOrder> {
  let row = sqlx::query_as::<_, TempOrder>(&format!(
    "INSERT INTO temp_orders (id, customer_info, cart_items, discount_code, user_id, total_cents, expires_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    TEMP_ORDER_COLUMNS
  ))
  .bind(new.id)
  .bind(Json(&new.customer))
  .bind(Json(&new.cart))
  .bind(new.discount_code.as_deref())
  .bind(new.user_id)
  .bind(new.total_cents)
  .bind(new.expires_at)
  .fetch_one(pool)
  .await?;
  Ok(row)
}

pub async fn find(pool: &PgPool, id: Uuid) -> AppResult<Option<TempOrder>> {
  let row = sqlx::query_as::<_, TempOrder>(&format!("SELECT {} FROM temp_orders WHERE id = $1", TEMP_ORDER_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(row)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<bool> {
  let result = sqlx::query("DELETE FROM temp_orders WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() > 0)
}

/// Removes staged checkouts that expired at or before `cutoff`.
pub async fn delete_expired(pool: &PgPool, cutoff: DateTime<Utc>) -> AppResult<u64> {
  let result = sqlx::query("DELETE FROM temp_orders WHERE expires_at <= $1")
    .bind(cutoff)
    .execute(pool)
    .await?;
  Ok(result.rows_affected())
}
