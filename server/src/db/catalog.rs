// server/src/db/catalog.rs

//! Categories and menu items.

use crate::errors::Result as AppResult;
use crate::models::category::Category;
use crate::models::menu_item::{MenuItem, MenuItemWithCategory};
use sqlx::PgPool;
use tracing::info;

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";
const MENU_COLUMNS: &str = "id, name, description, price_cents, image_url, category_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct MenuItemFields {
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub image_url: String,
  pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItemDeletion {
  Deleted,
  NotFound,
  /// Distinct ids of the orders still referencing the item.
  Referenced(Vec<i64>),
}

// --- Categories ---

pub async fn list_categories(pool: &PgPool) -> AppResult<Vec<Category>> {
  let rows = sqlx::query_as::<_, Category>(&format!("SELECT {} FROM categories ORDER BY name, id", CATEGORY_COLUMNS))
    .fetch_all(pool)
    .await?;
  Ok(rows)
}

pub async fn find_category(pool: &PgPool, id: i64) -> AppResult<Option<Category>> {
  let row = sqlx::query_as::<_, Category>(&format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(row)
}

pub async fn category_exists(pool: &PgPool, id: i64) -> AppResult<bool> {
  let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
    .bind(id)
    .fetch_one(pool)
    .await?;
  Ok(exists)
}

pub async fn insert_category(pool: &PgPool, name: &str, description: &str) -> AppResult<Category> {
  let row = sqlx::query_as::<_, Category>(&format!(
    "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING {}",
    CATEGORY_COLUMNS
  ))
  .bind(name)
  .bind(description)
  .fetch_one(pool)
  .await?;
  Ok(row)
}

pub async fn update_category(pool: &PgPool, id: i64, name: &str, description: &str) -> AppResult<Option<Category>> {
  let row = sqlx::query_as::<_, Category>(&format!(
    "UPDATE categories SET name = $2, description = $3, updated_at = NOW() WHERE id = $1 RETURNING {}",
    CATEGORY_COLUMNS
  ))
  .bind(id)
  .bind(name)
  .bind(description)
  .fetch_optional(pool)
  .await?;
  Ok(row)
}

/// Detaches the category's menu items, then removes it. Returns false when absent.
pub async fn delete_category(pool: &PgPool, id: i64) -> AppResult<bool> {
  let mut tx = pool.begin().await?;
  let detached = sqlx::query("UPDATE menu_items SET category_id = NULL, updated_at = NOW() WHERE category_id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  if deleted == 0 {
    tx.rollback().await?;
    return Ok(false);
  }
  tx.commit().await?;
  info!(category_id = id, detached_items = detached, "Category deleted.");
  Ok(true)
}

// --- Menu items ---

pub async fn list_menu(pool: &PgPool) -> AppResult<Vec<MenuItemWithCategory>> {
  let rows = sqlx::query_as::<_, MenuItemWithCategory>(
    "SELECT m.id, m.name, m.description, m.price_cents, m.image_url, m.category_id, c.name AS category_name \
     FROM menu_items m LEFT JOIN categories c ON c.id = m.category_id \
     ORDER BY m.id",
  )
  .fetch_all(pool)
  .await?;
  Ok(rows)
}

pub async fn find_menu_item(pool: &PgPool, id: i64) -> AppResult<Option<MenuItem>> {
  let row = sqlx::query_as::<_, MenuItem>(&format!("SELECT {} FROM menu_items WHERE id = $1", MENU_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(row)
}

/// Live rows for the given ids; unknown ids are simply absent.
pub async fn menu_items_by_ids(pool: &PgPool, ids: &[i64]) -> AppResult<Vec<MenuItem>> {
  let rows = sqlx::query_as::<_, MenuItem>(&format!("SELECT {} FROM menu_items WHERE id = ANY($1)", MENU_COLUMNS))
    .bind(ids)
    .fetch_all(pool)
    .await?;
  Ok(rows)
}

pub async fn insert_menu_item(pool: &PgPool, fields: &MenuItemFields) -> AppResult<MenuItem> {
  let row = sqlx::query_as::<_, MenuItem>(&format!(
    "INSERT INTO menu_items (name, description, price_cents, image_url, category_id) \
     VALUES ($1, $2, $3, $4, $5) RETURNING {}",
    MENU_COLUMNS
  ))
  .bind(&fields.name)
  .bind(&fields.description)
  .bind(fields.price_cents)
  .bind(&fields.image_url)
  .bind(fields.category_id)
  .fetch_one(pool)
  .await?;
  Ok(row)
}

pub async fn update_menu_item(pool: &PgPool, id: i64, fields: &MenuItemFields) -> AppResult<Option<MenuItem>> {
  let row = sqlx::query_as::<_, MenuItem>(&format!(
    "UPDATE menu_items SET name = $2, description = $3, price_cents = $4, image_url = $5, category_id = $6, \
     updated_at = NOW() WHERE id = $1 RETURNING {}",
    MENU_COLUMNS
  ))
  .bind(id)
  .bind(&fields.name)
  .bind(&fields.description)
  .bind(fields.price_cents)
  .bind(&fields.image_url)
  .bind(fields.category_id)
  .fetch_optional(pool)
  .await?;
  Ok(row)
}

pub async fn delete_menu_item(pool: &PgPool, id: i64) -> AppResult<MenuItemDeletion> {
  let mut tx = pool.begin().await?;
  let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM menu_items WHERE id = $1)")
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
  if !exists {
    tx.rollback().await?;
    return Ok(MenuItemDeletion::NotFound);
  }

  let order_ids = sqlx::query_scalar::<_, i64>(
    "SELECT DISTINCT order_id FROM order_items WHERE menu_item_id = $1 ORDER BY order_id",
  )
  .bind(id)
  .fetch_all(&mut *tx)
  .await?;
  if !order_ids.is_empty() {
    tx.rollback().await?;
    return Ok(MenuItemDeletion::Referenced(order_ids));
  }

  sqlx::query("DELETE FROM menu_items WHERE id = $1").bind(id).execute(&mut *tx).await?;
  tx.commit().await?;
  Ok(MenuItemDeletion::Deleted)
}
