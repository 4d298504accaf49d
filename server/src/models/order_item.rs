// server/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;

/// Order item joined with the menu item it refers to. `price` is the unit
/// price charged when the order was placed, never the live menu price.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemDetail {
  pub id: i64,
  pub order_id: i64,
  pub menu_item_id: i64,
  pub quantity: i32,
  #[serde(rename = "price", with = "crate::models::money")]
  pub price_cents: i64,
  pub menu_item_name: String,
  pub menu_item_image_url: String,
}
