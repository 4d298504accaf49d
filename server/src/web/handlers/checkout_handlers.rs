// server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::money;
use crate::models::order::CustomerInfo;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CartSubmission, CheckoutCtxData, FinalizeCtxData};
use crate::services::discount_engine::CartLine;
use crate::state::AppState;
use crate::web::extractors::MaybeUser;
use lokanta_flow::{ContextData, PipelineResult};

// --- Request DTOs ---

/// Cart submission body shared by checkout and direct orders.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartRequestPayload {
  #[serde(default)]
  pub customer_info: CustomerInfo,
  #[serde(default)]
  pub cart_items: Vec<CartLine>,
  #[serde(default)]
  pub discount_code: Option<String>,
  /// Earlier storefront builds echo the whole quote back; only its code is read.
  #[serde(default)]
  pub discount: Option<Value>,
}

impl CartRequestPayload {
  pub fn code(&self) -> Option<String> {
    let echoed = self
      .discount
      .as_ref()
      .and_then(|d| d.pointer("/discountCode/code"))
      .and_then(Value::as_str);
    common_steps::normalized_code(self.discount_code.as_deref().or(echoed))
  }

  pub fn into_submission(self, user_id: Option<i64>) -> CartSubmission {
    let discount_code = self.code();
    let mut customer = self.customer_info;
    customer.email = customer.email.trim().to_string();
    CartSubmission {
      customer,
      cart: self.cart_items,
      discount_code,
      user_id,
    }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSuccessPayload {
  #[serde(default)]
  pub session_id: String,
}

// --- Handlers ---

#[instrument(
  name = "handler::start_checkout",
  skip_all,
  fields(user_id = ?maybe_user.0.as_ref().map(|u| u.id), lines = req_payload.cart_items.len())
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  maybe_user: MaybeUser,
  req_payload: web::Json<CartRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = maybe_user.0.as_ref().map(|u| u.id);
  let checkout_ctx_initial = CheckoutCtxData {
    app_state: app_state.get_ref().clone(),
    submission: req_payload.into_inner().into_submission(user_id),
    priced_cart: Vec::new(),
    allocation: None,
    temp_order_id: None,
    staged_until: None,
    session: None,
  };
  let ctx_data = ContextData::new(checkout_ctx_initial);

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (session, total) = ctx_data.snapshot(|c| (c.session.clone(), c.allocation.as_ref().map(|a| a.new_total_cents)));
      let (Some(session), Some(total)) = (session, total) else {
        warn!("Checkout pipeline completed without a payment session.");
        return Err(AppError::Internal("Checkout completed without a payment session.".to_string()));
      };
      info!(session_id = %session.id, total, "Checkout started.");
      Ok(HttpResponse::Ok().json(json!({
        "url": session.url,
        "sessionId": session.id,
        "total": money::to_decimal(total),
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

/// Called by the storefront after the provider redirects back. Safe to repeat.
#[instrument(name = "handler::checkout_success", skip_all, fields(session_id = %req_payload.session_id))]
pub async fn checkout_success_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CheckoutSuccessPayload>,
) -> Result<HttpResponse, AppError> {
  let finalize_ctx_initial = FinalizeCtxData {
    app_state: app_state.get_ref().clone(),
    session_id: req_payload.into_inner().session_id,
    session: None,
    temp_order: None,
    allocation: None,
    payment_status: String::new(),
    order: None,
    duplicate: false,
    emails_sent: false,
  };
  let ctx_data = ContextData::new(finalize_ctx_initial);

  // A replay stops the pipeline early with the existing order in context.
  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) | Ok(PipelineResult::Stopped) => {
      let (order, duplicate, emails_sent) = ctx_data.snapshot(|c| (c.order.clone(), c.duplicate, c.emails_sent));
      let order = order.ok_or_else(|| {
        warn!("Finalize pipeline ended without an order.");
        AppError::Internal("Payment confirmation ended without an order.".to_string())
      })?;
      info!(order_id = order.id, duplicate, emails_sent, "Payment confirmation handled.");
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "orderId": order.id,
        "duplicate": duplicate,
        "paymentStatus": order.payment_status,
      })))
    }
    Err(app_err) => Err(app_err),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn explicit_code_wins_over_echoed_quote() {
    let payload: CartRequestPayload = serde_json::from_value(json!({
      "discountCode": " SAVE10 ",
      "discount": { "discountCode": { "code": "OLD" } }
    }))
    .unwrap();
    assert_eq!(payload.code().as_deref(), Some("SAVE10"));
  }

  #[test]
  fn echoed_quote_code_is_used_as_fallback() {
    let payload: CartRequestPayload = serde_json::from_value(json!({
      "customerInfo": { "firstName": "Ayşe", "email": " ayse@example.com " },
      "cartItems": [{ "id": 1, "price": 100, "quantity": 2 }],
      "discount": { "newTotal": 180, "discountCode": { "code": "SAVE10" } }
    }))
    .unwrap();
    let submission = payload.into_submission(Some(7));
    assert_eq!(submission.discount_code.as_deref(), Some("SAVE10"));
    assert_eq!(submission.customer.email, "ayse@example.com");
    assert_eq!(submission.cart[0].price_cents, 10000);
    assert_eq!(submission.user_id, Some(7));
  }

  #[test]
  fn blank_code_means_no_discount() {
    let payload: CartRequestPayload = serde_json::from_value(json!({ "discountCode": "  " })).unwrap();
    assert_eq!(payload.code(), None);
  }
}
