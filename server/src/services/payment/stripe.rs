// server/src/services/payment/stripe.rs

use super::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Stripe Checkout over its form-encoded REST API.
pub struct StripeGateway {
  client: reqwest::Client,
  api_base: String,
  secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
  id: String,
  url: Option<String>,
  amount_total: Option<i64>,
  payment_status: String,
  #[serde(default)]
  metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
  error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
  message: Option<String>,
}

impl From<StripeSession> for CheckoutSession {
  fn from(s: StripeSession) -> Self {
    CheckoutSession {
      id: s.id,
      url: s.url,
      amount_total_cents: s.amount_total.unwrap_or_default(),
      payment_status: s.payment_status,
      metadata: s.metadata,
    }
  }
}

impl StripeGateway {
  pub fn new(api_base: String, secret_key: String) -> AppResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok(Self {
      client,
      api_base,
      secret_key,
    })
  }

  fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
      ("mode".to_string(), "payment".to_string()),
      ("payment_method_types[0]".to_string(), "card".to_string()),
      ("line_items[0][quantity]".to_string(), "1".to_string()),
      ("line_items[0][price_data][currency]".to_string(), request.currency.clone()),
      (
        "line_items[0][price_data][unit_amount]".to_string(),
        request.amount_cents.to_string(),
      ),
      (
        "line_items[0][price_data][product_data][name]".to_string(),
        request.product_name.clone(),
      ),
      ("customer_email".to_string(), request.customer_email.clone()),
      ("success_url".to_string(), request.success_url.clone()),
      ("cancel_url".to_string(), request.cancel_url.clone()),
      ("expires_at".to_string(), request.expires_at.timestamp().to_string()),
    ];
    for (key, value) in &request.metadata {
      form.push((format!("metadata[{}]", key), value.clone()));
    }
    form
  }

  async fn parse_response(response: reqwest::Response) -> AppResult<CheckoutSession> {
    let status = response.status();
    if status.is_success() {
      let session: StripeSession = response.json().await?;
      return Ok(session.into());
    }

    let message = response
      .json::<StripeErrorBody>()
      .await
      .ok()
      .and_then(|b| b.error.message)
      .unwrap_or_else(|| format!("HTTP {}", status));
    warn!(status = status.as_u16(), %message, "Payment provider rejected the request.");
    if status == reqwest::StatusCode::NOT_FOUND {
      Err(AppError::NotFound(format!("Payment session not found: {}", message)))
    } else {
      Err(AppError::PaymentProvider(message))
    }
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "stripe::create_session", skip_all, fields(amount = request.amount_cents, currency = %request.currency))]
  async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    let response = self
      .client
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .bearer_auth(&self.secret_key)
      .form(&Self::session_form(&request))
      .send()
      .await?;
    let session = Self::parse_response(response).await?;
    info!(session_id = %session.id, "Checkout session created.");
    Ok(session)
  }

  #[instrument(name = "stripe::retrieve_session", skip(self))]
  async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
    if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      return Err(AppError::Validation("Invalid payment session id".to_string()));
    }
    let response = self
      .client
      .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
      .bearer_auth(&self.secret_key)
      .send()
      .await?;
    Self::parse_response(response).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn form_carries_amount_and_metadata() {
    let request = CheckoutSessionRequest {
      amount_cents: 22_500,
      currency: "try".into(),
      customer_email: "musteri@example.com".into(),
      product_name: "İndirimli Sipariş (SAVE10)".into(),
      metadata: BTreeMap::from([
        ("tempOrderId".to_string(), "5f0c".to_string()),
        ("userId".to_string(), "".to_string()),
      ]),
      success_url: "http://x/checkout/success?session_id={CHECKOUT_SESSION_ID}".into(),
      cancel_url: "http://x/checkout/cancel".into(),
      expires_at: chrono::DateTime::from_timestamp(1_740_840_000, 0).unwrap(),
    };
    let form = StripeGateway::session_form(&request);
    let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

    assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("22500"));
    assert_eq!(get("metadata[tempOrderId]"), Some("5f0c"));
    assert_eq!(get("metadata[userId]"), Some(""));
    assert_eq!(get("mode"), Some("payment"));
    assert_eq!(get("expires_at"), Some("1740840000"));
  }

  #[test]
  fn provider_session_maps_to_checkout_session() {
    let raw = serde_json::json!({
      "id": "cs_test_1",
      "url": null,
      "amount_total": 22500,
      "payment_status": "paid",
      "metadata": { "tempOrderId": "5f0c" }
    });
    let session: CheckoutSession = serde_json::from_value::<StripeSession>(raw).unwrap().into();
    assert!(session.is_paid());
    assert_eq!(session.amount_total_cents, 22_500);
    assert_eq!(session.metadata_value("tempOrderId"), Some("5f0c"));
  }
}
