// server/src/db/discounts.rs

use crate::errors::Result as AppResult;
use crate::models::discount::{DiscountCode, DiscountCodeWithItems, LinkedMenuItem};
use crate::services::discount_engine::DiscountRule;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

const DISCOUNT_COLUMNS: &str = "id, code, amount, is_percent, min_order_cents, max_uses, used_count, \
  start_date, end_date, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct DiscountFields {
  pub code: String,
  pub amount: i64,
  pub is_percent: bool,
  pub min_order_cents: Option<i64>,
  pub max_uses: Option<i32>,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub is_active: bool,
  pub menu_item_ids: Vec<i64>,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
  discount_code_id: i64,
  id: i64,
  name: String,
}

pub async fn list_with_items(pool: &PgPool) -> AppResult<Vec<DiscountCodeWithItems>> {
  let codes = sqlx::query_as::<_, DiscountCode>(&format!(
    "SELECT {} FROM discount_codes ORDER BY created_at DESC, id DESC",
    DISCOUNT_COLUMNS
  ))
  .fetch_all(pool)
  .await?;

  let links = sqlx::query_as::<_, LinkRow>(
    "SELECT dmi.discount_code_id, m.id, m.name \
     FROM discount_menu_items dmi JOIN menu_items m ON m.id = dmi.menu_item_id \
     ORDER BY m.id",
  )
  .fetch_all(pool)
  .await?;

  let mut by_code: HashMap<i64, Vec<LinkedMenuItem>> = HashMap::new();
  for link in links {
    by_code
      .entry(link.discount_code_id)
      .or_default()
      .push(LinkedMenuItem { id: link.id, name: link.name });
  }

  Ok(
    codes
      .into_iter()
      .map(|code| {
        let items = by_code.remove(&code.id).unwrap_or_default();
        DiscountCodeWithItems::new(code, items)
      })
      .collect(),
  )
}

pub async fn find(pool: &PgPool, id: i64) -> AppResult<Option<DiscountCodeWithItems>> {
  let Some(code) = sqlx::query_as::<_, DiscountCode>(&format!("SELECT {} FROM discount_codes WHERE id = $1", DISCOUNT_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?
  else {
    return Ok(None);
  };
  let items = linked_items(pool, id).await?;
  Ok(Some(DiscountCodeWithItems::new(code, items)))
}

async fn linked_items(pool: &PgPool, discount_id: i64) -> AppResult<Vec<LinkedMenuItem>> {
  let items = sqlx::query_as::<_, LinkedMenuItem>(
    "SELECT m.id, m.name FROM discount_menu_items dmi JOIN menu_items m ON m.id = dmi.menu_item_id \
     WHERE dmi.discount_code_id = $1 ORDER BY m.id",
  )
  .bind(discount_id)
  .fetch_all(pool)
  .await?;
  Ok(items)
}

/// Loads a code by its exact text together with its eligible item ids.
pub async fn find_rule_by_code(pool: &PgPool, code: &str) -> AppResult<Option<DiscountRule>> {
  let Some(discount) = sqlx::query_as::<_, DiscountCode>(&format!(
    "SELECT {} FROM discount_codes WHERE code = $1",
    DISCOUNT_COLUMNS
  ))
  .bind(code)
  .fetch_optional(pool)
  .await?
  else {
    return Ok(None);
  };

  let item_ids = sqlx::query_scalar::<_, i64>("SELECT menu_item_id FROM discount_menu_items WHERE discount_code_id = $1")
    .bind(discount.id)
    .fetch_all(pool)
    .await?;
  Ok(Some(discount.into_rule(item_ids)))
}

pub async fn code_taken(pool: &PgPool, code: &str, except_id: Option<i64>) -> AppResult<bool> {
  let taken = sqlx::query_scalar::<_, bool>(
    "SELECT EXISTS(SELECT 1 FROM discount_codes WHERE code = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
  )
  .bind(code)
  .bind(except_id)
  .fetch_one(pool)
  .await?;
  Ok(taken)
}

async fn replace_links(conn: &mut PgConnection, discount_id: i64, menu_item_ids: &[i64]) -> Result<(), sqlx::Error> {
  sqlx::query("DELETE FROM discount_menu_items WHERE discount_code_id = $1")
    .bind(discount_id)
    .execute(&mut *conn)
    .await?;
  if !menu_item_ids.is_empty() {
    // Unknown item ids are dropped rather than failing the whole write.
    sqlx::query(
      "INSERT INTO discount_menu_items (discount_code_id, menu_item_id) \
       SELECT $1, m.id FROM menu_items m WHERE m.id = ANY($2) ON CONFLICT DO NOTHING",
    )
    .bind(discount_id)
    .bind(menu_item_ids)
    .execute(&mut *conn)
    .await?;
  }
  Ok(())
}

pub async fn insert(pool: &PgPool, fields: &DiscountFields) -> Result<i64, sqlx::Error> {
  let mut tx = pool.begin().await?;
  let id = sqlx::query_scalar::<_, i64>(
    "INSERT INTO discount_codes (code, amount, is_percent, min_order_cents, max_uses, start_date, end_date, is_active) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
  )
  .bind(&fields.code)
  .bind(fields.amount)
  .bind(fields.is_percent)
  .bind(fields.min_order_cents)
  .bind(fields.max_uses)
  .bind(fields.start_date)
  .bind(fields.end_date)
  .bind(fields.is_active)
  .fetch_one(&mut *tx)
  .await?;
  replace_links(&mut tx, id, &fields.menu_item_ids).await?;
  tx.commit().await?;
  Ok(id)
}

/// Returns false when no such code exists.
pub async fn update(pool: &PgPool, id: i64, fields: &DiscountFields) -> Result<bool, sqlx::Error> {
  let mut tx = pool.begin().await?;
  let updated = sqlx::query(
    "UPDATE discount_codes SET code = $2, amount = $3, is_percent = $4, min_order_cents = $5, max_uses = $6, \
     start_date = $7, end_date = $8, is_active = $9, updated_at = NOW() WHERE id = $1",
  )
  .bind(id)
  .bind(&fields.code)
  .bind(fields.amount)
  .bind(fields.is_percent)
  .bind(fields.min_order_cents)
  .bind(fields.max_uses)
  .bind(fields.start_date)
  .bind(fields.end_date)
  .bind(fields.is_active)
  .execute(&mut *tx)
  .await?
  .rows_affected();
  if updated == 0 {
    tx.rollback().await?;
    return Ok(false);
  }
  replace_links(&mut tx, id, &fields.menu_item_ids).await?;
  tx.commit().await?;
  Ok(true)
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
  let mut tx = pool.begin().await?;
  sqlx::query("DELETE FROM discount_menu_items WHERE discount_code_id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?;
  let deleted = sqlx::query("DELETE FROM discount_codes WHERE id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  tx.commit().await?;
  Ok(deleted > 0)
}
