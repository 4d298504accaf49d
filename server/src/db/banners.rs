// server/src/db/banners.rs

use crate::errors::Result as AppResult;
use crate::models::banner::Banner;
use sqlx::PgPool;

const BANNER_COLUMNS: &str = "id, title, description, image_url, link_url, is_active, display_order, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct BannerFields {
  pub title: String,
  pub description: String,
  pub image_url: String,
  pub link_url: String,
  pub is_active: bool,
  pub display_order: i32,
}

pub async fn list(pool: &PgPool, active_only: bool) -> AppResult<Vec<Banner>> {
  let rows = sqlx::query_as::<_, Banner>(&format!(
    "SELECT {} FROM banners WHERE ($1 = FALSE OR is_active) ORDER BY display_order, id",
    BANNER_COLUMNS
  ))
  .bind(active_only)
  .fetch_all(pool)
  .await?;
  Ok(rows)
}

pub async fn find(pool: &PgPool, id: i64) -> AppResult<Option<Banner>> {
  let row = sqlx::query_as::<_, Banner>(&format!("SELECT {} FROM banners WHERE id = $1", BANNER_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(row)
}

pub async fn insert(pool: &PgPool, fields: &BannerFields) -> AppResult<Banner> {
  let row = sqlx::query_as::<_, Banner>(&format!(
    "INSERT INTO banners (title, description, image_url, link_url, is_active, display_order) \
     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
    BANNER_COLUMNS
  ))
  .bind(&fields.title)
  .bind(&fields.description)
  .bind(&fields.image_url)
  .bind(&fields.link_url)
  .bind(fields.is_active)
  .bind(fields.display_order)
  .fetch_one(pool)
  .await?;
  Ok(row)
}

pub async fn update(pool: &PgPool, id: i64, fields: &BannerFields) -> AppResult<Option<Banner>> {
  let row = sqlx::query_as::<_, Banner>(&format!(
    "UPDATE banners SET title = $2, description = $3, image_url = $4, link_url = $5, is_active = $6, \
     display_order = $7, updated_at = NOW() WHERE id = $1 RETURNING {}",
    BANNER_COLUMNS
  ))
  .bind(id)
  .bind(&fields.title)
  .bind(&fields.description)
  .bind(&fields.image_url)
  .bind(&fields.link_url)
  .bind(fields.is_active)
  .bind(fields.display_order)
  .fetch_optional(pool)
  .await?;
  Ok(row)
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
  let result = sqlx::query("DELETE FROM banners WHERE id = $1").bind(id).execute(pool).await?;
  Ok(result.rows_affected() > 0)
}
