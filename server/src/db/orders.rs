// server/src/db/orders.rs

use crate::errors::Result as AppResult;
use crate::models::order::{NewOrder, NewOrderItem, Order, OrderStatus, OrderWithItems};
use crate::models::order_item::OrderItemDetail;
use sqlx::PgPool;
use std::collections::HashMap;

const ORDER_COLUMNS: &str = "id, user_id, first_name, last_name, email, phone, address, note, total_cents, \
  discount_code, status, payment_status, payment_session_id, created_at, updated_at";

const ITEM_DETAIL_SELECT: &str = "SELECT oi.id, oi.order_id, oi.menu_item_id, oi.quantity, oi.price_cents, \
  m.name AS menu_item_name, m.image_url AS menu_item_image_url \
  FROM order_items oi JOIN menu_items m ON m.id = oi.menu_item_id";

/// Result of a status change: the row after the update and the status before it.
#[derive(Debug, Clone)]
pub struct StatusChange {
  pub order: Order,
  pub previous: OrderStatus,
}

/// Inserts the order and its items in one transaction.
///
/// A unique violation on `payment_session_id` surfaces as the raw sqlx error
/// so the caller can resolve the replay.
pub async fn insert_with_items(pool: &PgPool, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order, sqlx::Error> {
  let mut tx = pool.begin().await?;
  let created = sqlx::query_as::<_, Order>(&format!(
    "INSERT INTO orders (user_id, first_name, last_name, email, phone, address, note, total_cents, \
     discount_code, payment_status, payment_session_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
    ORDER_COLUMNS
  ))
  .bind(order.user_id)
  .bind(&order.customer.first_name)
  .bind(&order.customer.last_name)
  .bind(&order.customer.email)
  .bind(&order.customer.phone)
  .bind(&order.customer.address)
  .bind(order.customer.note.as_deref())
  .bind(order.total_cents)
  .bind(order.discount_code.as_deref())
  .bind(&order.payment_status)
  .bind(order.payment_session_id.as_deref())
  .fetch_one(&mut *tx)
  .await?;

  for item in items {
    sqlx::query("INSERT INTO order_items (order_id, menu_item_id, quantity, price_cents) VALUES ($1, $2, $3, $4)")
      .bind(created.id)
      .bind(item.menu_item_id)
      .bind(item.quantity)
      .bind(item.price_cents)
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  Ok(created)
}

pub async fn find_by_payment_session(pool: &PgPool, session_id: &str) -> AppResult<Option<Order>> {
  let order = sqlx::query_as::<_, Order>(&format!(
    "SELECT {} FROM orders WHERE payment_session_id = $1",
    ORDER_COLUMNS
  ))
  .bind(session_id)
  .fetch_optional(pool)
  .await?;
  Ok(order)
}

pub async fn find(pool: &PgPool, id: i64) -> AppResult<Option<Order>> {
  let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(id)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

pub async fn items_for(pool: &PgPool, order_id: i64) -> AppResult<Vec<OrderItemDetail>> {
  let items = sqlx::query_as::<_, OrderItemDetail>(&format!("{} WHERE oi.order_id = $1 ORDER BY oi.id", ITEM_DETAIL_SELECT))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
  Ok(items)
}

pub async fn find_with_items(pool: &PgPool, id: i64) -> AppResult<Option<OrderWithItems>> {
  let Some(order) = find(pool, id).await? else {
    return Ok(None);
  };
  let items = items_for(pool, id).await?;
  Ok(Some(OrderWithItems { order, items }))
}

async fn attach_items(pool: &PgPool, orders: Vec<Order>) -> AppResult<Vec<OrderWithItems>> {
  let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
  let items = sqlx::query_as::<_, OrderItemDetail>(&format!(
    "{} WHERE oi.order_id = ANY($1) ORDER BY oi.id",
    ITEM_DETAIL_SELECT
  ))
  .bind(&ids)
  .fetch_all(pool)
  .await?;

  let mut by_order: HashMap<i64, Vec<OrderItemDetail>> = HashMap::new();
  for item in items {
    by_order.entry(item.order_id).or_default().push(item);
  }
  Ok(
    orders
      .into_iter()
      .map(|order| {
        let items = by_order.remove(&order.id).unwrap_or_default();
        OrderWithItems { order, items }
      })
      .collect(),
  )
}

/// Every order, newest first.
pub async fn list_all(pool: &PgPool) -> AppResult<Vec<OrderWithItems>> {
  let orders = sqlx::query_as::<_, Order>(&format!(
    "SELECT {} FROM orders ORDER BY created_at DESC, id DESC",
    ORDER_COLUMNS
  ))
  .fetch_all(pool)
  .await?;
  attach_items(pool, orders).await
}

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> AppResult<Vec<OrderWithItems>> {
  let orders = sqlx::query_as::<_, Order>(&format!(
    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    ORDER_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  attach_items(pool, orders).await
}

/// Sets the status and reports what it was before, in a single statement.
pub async fn update_status(pool: &PgPool, id: i64, status: OrderStatus) -> AppResult<Option<StatusChange>> {
  #[derive(sqlx::FromRow)]
  struct Row {
    #[sqlx(flatten)]
    order: Order,
    previous_status: OrderStatus,
  }

  let row = sqlx::query_as::<_, Row>(
    "UPDATE orders o SET status = $2, updated_at = NOW() \
     FROM (SELECT id, status FROM orders WHERE id = $1 FOR UPDATE) prev \
     WHERE o.id = prev.id \
     RETURNING o.id, o.user_id, o.first_name, o.last_name, o.email, o.phone, o.address, o.note, o.total_cents, \
     o.discount_code, o.status, o.payment_status, o.payment_session_id, o.created_at, o.updated_at, \
     prev.status AS previous_status",
  )
  .bind(id)
  .bind(status)
  .fetch_optional(pool)
  .await?;

  Ok(row.map(|r| StatusChange {
    order: r.order,
    previous: r.previous_status,
  }))
}

/// Removes the order's items, then the order. Returns false when absent.
pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
  let mut tx = pool.begin().await?;
  sqlx::query("DELETE FROM order_items WHERE order_id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?;
  let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  if deleted == 0 {
    tx.rollback().await?;
    return Ok(false);
  }
  tx.commit().await?;
  Ok(true)
}
