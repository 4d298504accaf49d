// server/src/services/payment/mod.rs

//! Hosted-checkout payment gateway abstraction.

mod mock;
mod stripe;

pub use mock::MockGateway;
pub use stripe::StripeGateway;

use crate::config::{AppConfig, PaymentProviderKind};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Placeholder the provider substitutes with the session id in redirect URLs.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Longest a hosted session may stay open. Staged checkouts are kept at
/// least this long past their own expiry so a late payment still finds its cart.
pub const MAX_SESSION_LIFETIME_HOURS: i64 = 24;
const MIN_SESSION_LIFETIME_MINUTES: i64 = 31;

/// Expiry to request for a hosted session backing a checkout staged until
/// `staged_until`, kept inside the window the provider accepts.
pub fn session_expiry(staged_until: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
  let earliest = now + Duration::minutes(MIN_SESSION_LIFETIME_MINUTES);
  let latest = now + Duration::hours(MAX_SESSION_LIFETIME_HOURS) - Duration::minutes(1);
  staged_until.clamp(earliest, latest)
}

pub mod metadata_keys {
  pub const TEMP_ORDER_ID: &str = "tempOrderId";
  pub const USER_ID: &str = "userId";
  pub const DISCOUNT_CODE: &str = "discountCode";
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub amount_cents: i64,
  pub currency: String,
  pub customer_email: String,
  pub product_name: String,
  pub metadata: BTreeMap<String, String>,
  pub success_url: String,
  pub cancel_url: String,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
  pub id: String,
  pub url: Option<String>,
  pub amount_total_cents: i64,
  /// Provider's payment status, `"paid"` once funds are captured.
  pub payment_status: String,
  pub metadata: BTreeMap<String, String>,
}

impl CheckoutSession {
  pub fn is_paid(&self) -> bool {
    self.payment_status == "paid"
  }

  pub fn metadata_value(&self, key: &str) -> Option<&str> {
    self.metadata.get(key).map(String::as_str).filter(|v| !v.is_empty())
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> AppResult<CheckoutSession>;

  async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSession>;
}

pub fn gateway_from_config(config: &AppConfig) -> AppResult<Arc<dyn PaymentGateway>> {
  match config.payment_provider {
    PaymentProviderKind::Mock => {
      tracing::warn!("Using the in-process mock payment gateway.");
      Ok(Arc::new(MockGateway::new()))
    }
    PaymentProviderKind::Stripe => {
      let key = config
        .stripe_secret_key
        .clone()
        .ok_or_else(|| AppError::Config("STRIPE_SECRET_KEY is required for the stripe provider".to_string()))?;
      Ok(Arc::new(StripeGateway::new(config.stripe_api_base.clone(), key)?))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
  }

  #[test]
  fn session_expiry_follows_the_staged_checkout() {
    assert_eq!(session_expiry(at(14, 0), at(12, 0)), at(14, 0));
  }

  #[test]
  fn session_expiry_is_clamped_to_the_provider_window() {
    let now = at(12, 0);
    assert_eq!(session_expiry(at(12, 10), now), at(12, 31));
    let far = now + Duration::hours(72);
    assert_eq!(session_expiry(far, now), now + Duration::hours(24) - Duration::minutes(1));
  }
}
