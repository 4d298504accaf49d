// server/src/services/payment/mock.rs

use super::{CheckoutSession, CheckoutSessionRequest, PaymentGateway, SESSION_ID_PLACEHOLDER};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// In-process gateway. Sessions are paid immediately unless the amount
/// ends in `123` (mod 1000), which simulates a declined card.
#[derive(Default)]
pub struct MockGateway {
  sessions: Mutex<HashMap<String, CheckoutSession>>,
}

impl MockGateway {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  #[instrument(name = "mock_gateway::create_session", skip_all, fields(amount = request.amount_cents))]
  async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    if request.amount_cents <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero".to_string()));
    }

    let id = format!("cs_mock_{}", Uuid::new_v4().simple());
    let payment_status = if request.amount_cents % 1000 == 123 { "unpaid" } else { "paid" };
    let session = CheckoutSession {
      url: Some(request.success_url.replace(SESSION_ID_PLACEHOLDER, &id)),
      id: id.clone(),
      amount_total_cents: request.amount_cents,
      payment_status: payment_status.to_string(),
      metadata: request.metadata,
    };

    info!(session_id = %id, payment_status, "Mock checkout session created.");
    self.sessions.lock().insert(id, session.clone());
    Ok(session)
  }

  async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
    self
      .sessions
      .lock()
      .get(session_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Payment session '{}' not found", session_id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  fn request(amount_cents: i64) -> CheckoutSessionRequest {
    CheckoutSessionRequest {
      amount_cents,
      currency: "try".into(),
      customer_email: "musteri@example.com".into(),
      product_name: "Toplam Sipariş".into(),
      metadata: BTreeMap::from([("tempOrderId".to_string(), "abc".to_string())]),
      success_url: "http://localhost/checkout/success?session_id={CHECKOUT_SESSION_ID}".into(),
      cancel_url: "http://localhost/checkout/cancel".into(),
      expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    }
  }

  #[tokio::test]
  async fn created_sessions_can_be_retrieved() {
    let gateway = MockGateway::new();
    let session = gateway.create_checkout_session(request(22_500)).await.unwrap();
    assert!(session.is_paid());
    assert_eq!(
      session.url.as_deref(),
      Some(format!("http://localhost/checkout/success?session_id={}", session.id).as_str())
    );

    let fetched = gateway.retrieve_session(&session.id).await.unwrap();
    assert_eq!(fetched, session);
    assert_eq!(fetched.metadata_value("tempOrderId"), Some("abc"));
  }

  #[tokio::test]
  async fn declined_amounts_stay_unpaid() {
    let gateway = MockGateway::new();
    let session = gateway.create_checkout_session(request(1_123)).await.unwrap();
    assert!(!session.is_paid());
  }

  #[tokio::test]
  async fn unknown_and_zero_amount_sessions_fail() {
    let gateway = MockGateway::new();
    assert!(matches!(gateway.retrieve_session("cs_nope").await, Err(AppError::NotFound(_))));
    assert!(matches!(
      gateway.create_checkout_session(request(0)).await,
      Err(AppError::Payment(_))
    ));
  }
}
