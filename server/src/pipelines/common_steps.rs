// server/src/pipelines/common_steps.rs

//! Steps shared by the ordering pipelines: cart repricing, authoritative
//! discount computation and order notification emails.

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::menu_item::MenuItem;
use crate::models::order::NewOrderItem;
use crate::pipelines::contexts::{CartSubmission, SendOrderEmailsCtxData};
use crate::services::discount_engine::{compute_discount, Allocation, CartLine, DiscountRejection};
use crate::services::email::templates::{self, EmailLine};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use lokanta_flow::{ContextData, PipelineControl};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Upper bound on a single line's quantity.
pub const MAX_LINE_QUANTITY: i64 = 1000;

pub fn validate_submission(submission: &CartSubmission, require_email: bool) -> AppResult<()> {
  if submission.cart.is_empty() {
    return Err(AppError::Validation("Cart is empty.".to_string()));
  }
  if submission.customer.first_name.trim().is_empty() {
    return Err(AppError::Validation("Customer first name is required.".to_string()));
  }
  if require_email && submission.customer.email.trim().is_empty() {
    return Err(AppError::Validation("Customer email is required.".to_string()));
  }
  for line in &submission.cart {
    if line.quantity <= 0 || line.quantity > MAX_LINE_QUANTITY {
      return Err(AppError::Validation(format!(
        "Invalid quantity {} for menu item {}.",
        line.quantity, line.id
      )));
    }
  }
  Ok(())
}

/// Replaces client-sent prices and names with the live menu values.
pub fn reprice(cart: &[CartLine], menu: &[MenuItem]) -> AppResult<Vec<CartLine>> {
  let by_id: HashMap<i64, &MenuItem> = menu.iter().map(|m| (m.id, m)).collect();
  cart
    .iter()
    .map(|line| {
      let item = by_id
        .get(&line.id)
        .ok_or_else(|| AppError::Validation(format!("Menu item {} does not exist.", line.id)))?;
      Ok(CartLine {
        id: item.id,
        price_cents: item.price_cents,
        quantity: line.quantity,
        name: Some(item.name.clone()),
      })
    })
    .collect()
}

#[instrument(name = "common_step::price_cart", skip_all, fields(lines = cart.len()))]
pub async fn price_cart(pool: &PgPool, cart: &[CartLine]) -> AppResult<Vec<CartLine>> {
  let mut ids: Vec<i64> = cart.iter().map(|l| l.id).collect();
  ids.sort_unstable();
  ids.dedup();
  let menu = db::catalog::menu_items_by_ids(pool, &ids).await?;
  reprice(cart, &menu)
}

/// The code as submitted, or `None` when blank.
pub fn normalized_code(code: Option<&str>) -> Option<String> {
  code.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string)
}

/// Looks up `code` and computes the allocation for `cart` at `now`.
///
/// Without a code the cart is returned undiscounted. The rejection is
/// returned as-is so callers decide whether it is fatal.
#[instrument(name = "common_step::allocate", skip(pool, cart), fields(lines = cart.len()))]
pub async fn allocate(
  pool: &PgPool,
  code: Option<&str>,
  cart: &[CartLine],
  now: DateTime<Utc>,
) -> AppResult<Result<Allocation, DiscountRejection>> {
  let Some(code) = code else {
    return Ok(Ok(Allocation::undiscounted(cart)));
  };
  let rule = db::discounts::find_rule_by_code(pool, code).await?;
  Ok(compute_discount(rule.as_ref(), cart, now))
}

/// Like [`allocate`], but a rejected code is a validation error.
pub async fn allocate_or_reject(
  pool: &PgPool,
  code: Option<&str>,
  cart: &[CartLine],
  now: DateTime<Utc>,
) -> AppResult<Allocation> {
  allocate(pool, code, cart, now).await?.map_err(|rejection| {
    warn!(?code, %rejection, "Discount code rejected.");
    AppError::Validation(rejection.to_string())
  })
}

/// Order item rows priced at what the customer pays per unit.
pub fn order_items(allocation: &Allocation) -> AppResult<Vec<NewOrderItem>> {
  allocation
    .lines
    .iter()
    .map(|l| {
      let quantity = i32::try_from(l.line.quantity)
        .map_err(|_| AppError::Internal(format!("Quantity {} out of range", l.line.quantity)))?;
      Ok(NewOrderItem {
        menu_item_id: l.line.id,
        quantity,
        price_cents: l.unit_price_cents(),
      })
    })
    .collect()
}

pub fn email_lines(allocation: &Allocation) -> Vec<EmailLine> {
  allocation
    .lines
    .iter()
    .map(|l| EmailLine {
      name: l.line.name.clone().unwrap_or_else(|| format!("#{}", l.line.id)),
      quantity: l.line.quantity,
      unit_price_cents: l.unit_price_cents(),
    })
    .collect()
}

/// Sends the customer confirmation and the operator notification.
///
/// Stops at the first failure and returns it; callers treat email as best-effort.
#[instrument(name = "common_step::send_order_emails", skip(ctx_data), err(Display))]
pub async fn send_order_emails_step(ctx_data: ContextData<SendOrderEmailsCtxData>) -> AppResult<PipelineControl> {
  let (mailer, order, customer, lines) = ctx_data.snapshot(|c| {
    (
      c.app_state.mailer.clone(),
      c.order.clone(),
      c.customer.clone(),
      email_lines(&c.allocation),
    )
  });

  if !customer.email.trim().is_empty() {
    let message = templates::order_confirmation(order.id, &customer, &lines, order.total_cents);
    mailer.send(message).await?;
  }

  match mailer.operator_address() {
    Some(operator) => {
      let message = templates::operator_new_order(&operator, order.id, &customer, &lines, order.total_cents);
      mailer.send(message).await?;
    }
    None => warn!(order_id = order.id, "No operator address configured; new-order notification skipped."),
  }

  info!(order_id = order.id, "Order emails sent.");
  Ok(PipelineControl::Continue)
}

/// Best-effort; failures are logged and reported back as `false`.
pub async fn send_welcome_email(app_state: &AppState, email: &str, first_name: &str) -> bool {
  match app_state.mailer.send(templates::welcome(email, first_name)).await {
    Ok(_) => true,
    Err(e) => {
      warn!(%email, error = %e, "Welcome email could not be sent.");
      false
    }
  }
}
