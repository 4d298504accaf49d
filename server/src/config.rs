// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind {
  Stripe,
  Mock,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  pub payment_provider: PaymentProviderKind,
  pub stripe_secret_key: Option<String>,
  pub stripe_api_base: String,
  pub currency: String,

  pub email_user: Option<String>,
  pub email_password: Option<String>,
  pub operator_email: Option<String>,

  pub upload_dir: PathBuf,

  pub session_ttl_hours: i64,
  pub temp_order_ttl_hours: i64,
  pub temp_order_sweep_secs: u64,

  pub admin_bootstrap_email: Option<String>,
  pub admin_bootstrap_password: Option<String>,

  pub run_migrations: bool,
}

// Secrets stay out of logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("app_base_url", &self.app_base_url)
      .field("payment_provider", &self.payment_provider)
      .field("stripe_api_base", &self.stripe_api_base)
      .field("currency", &self.currency)
      .field("email_user", &self.email_user)
      .field("operator_email", &self.operator_email)
      .field("upload_dir", &self.upload_dir)
      .field("session_ttl_hours", &self.session_ttl_hours)
      .field("temp_order_ttl_hours", &self.temp_order_ttl_hours)
      .field("temp_order_sweep_secs", &self.temp_order_sweep_secs)
      .field("run_migrations", &self.run_migrations)
      .finish_non_exhaustive()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let require = |name: &str| get(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)));

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;
    let database_url = require("DATABASE_URL")?;
    let app_base_url = get("APP_BASE_URL")
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let payment_provider = match get("PAYMENT_PROVIDER").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("stripe") => PaymentProviderKind::Stripe,
      Some("mock") => PaymentProviderKind::Mock,
      Some(other) => {
        return Err(AppError::Config(format!(
          "Invalid PAYMENT_PROVIDER '{}': expected 'stripe' or 'mock'",
          other
        )))
      }
    };
    let stripe_secret_key = match payment_provider {
      PaymentProviderKind::Stripe => Some(require("STRIPE_SECRET_KEY")?),
      PaymentProviderKind::Mock => get("STRIPE_SECRET_KEY"),
    };
    let stripe_api_base = get("STRIPE_API_BASE")
      .unwrap_or_else(|| "https://api.stripe.com".to_string())
      .trim_end_matches('/')
      .to_string();
    let currency = get("CURRENCY").unwrap_or_else(|| "try".to_string()).to_ascii_lowercase();

    let email_user = get("EMAIL_USER");
    let email_password = get("EMAIL_PASSWORD");
    let operator_email = get("OPERATOR_EMAIL").or_else(|| email_user.clone());

    let upload_dir = PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "./public/uploads".to_string()));

    let session_ttl_hours = parse_or("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), 720i64)?;
    let temp_order_ttl_hours = parse_or("TEMP_ORDER_TTL_HOURS", get("TEMP_ORDER_TTL_HOURS"), 24i64)?;
    let temp_order_sweep_secs = parse_or("TEMP_ORDER_SWEEP_SECS", get("TEMP_ORDER_SWEEP_SECS"), 900u64)?;
    if session_ttl_hours <= 0 || temp_order_ttl_hours <= 0 || temp_order_sweep_secs == 0 {
      return Err(AppError::Config("Lifetimes and sweep interval must be positive".to_string()));
    }

    let run_migrations = parse_or("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), true)?;

    let config = Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      payment_provider,
      stripe_secret_key,
      stripe_api_base,
      currency,
      email_user,
      email_password,
      operator_email,
      upload_dir,
      session_ttl_hours,
      temp_order_ttl_hours,
      temp_order_sweep_secs,
      admin_bootstrap_email: get("ADMIN_BOOTSTRAP_EMAIL"),
      admin_bootstrap_password: get("ADMIN_BOOTSTRAP_PASSWORD"),
      run_migrations,
    };

    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_for_mock_provider() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://localhost/lokanta"),
      ("PAYMENT_PROVIDER", "mock"),
    ]))
    .unwrap();

    assert_eq!(cfg.server_host, "127.0.0.1");
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.app_base_url, "http://127.0.0.1:8080");
    assert_eq!(cfg.payment_provider, PaymentProviderKind::Mock);
    assert_eq!(cfg.currency, "try");
    assert_eq!(cfg.session_ttl_hours, 720);
    assert_eq!(cfg.temp_order_ttl_hours, 24);
    assert_eq!(cfg.temp_order_sweep_secs, 900);
    assert_eq!(cfg.upload_dir, PathBuf::from("./public/uploads"));
    assert!(cfg.run_migrations);
    assert!(cfg.email_user.is_none());
  }

  #[test]
  fn database_url_is_required() {
    let err = AppConfig::from_lookup(lookup_from(&[("PAYMENT_PROVIDER", "mock")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("DATABASE_URL")));
  }

  #[test]
  fn stripe_provider_requires_secret_key() {
    let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("STRIPE_SECRET_KEY")));
  }

  #[test]
  fn operator_email_falls_back_to_email_user() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://x"),
      ("STRIPE_SECRET_KEY", "sk_test_123"),
      ("EMAIL_USER", "siparis@lokanta.app"),
      ("APP_BASE_URL", "https://lokanta.app/"),
    ]))
    .unwrap();
    assert_eq!(cfg.operator_email.as_deref(), Some("siparis@lokanta.app"));
    assert_eq!(cfg.app_base_url, "https://lokanta.app");
    assert_eq!(cfg.payment_provider, PaymentProviderKind::Stripe);
  }

  #[test]
  fn invalid_numbers_are_rejected() {
    let err = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://x"),
      ("PAYMENT_PROVIDER", "mock"),
      ("SERVER_PORT", "eighty"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("SERVER_PORT")));
  }

  #[test]
  fn debug_output_hides_secrets() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://user:hunter2@db/lokanta"),
      ("STRIPE_SECRET_KEY", "sk_live_secret"),
      ("EMAIL_PASSWORD", "mailpass"),
    ]))
    .unwrap();
    let rendered = format!("{:?}", cfg);
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("sk_live_secret"));
    assert!(!rendered.contains("mailpass"));
  }
}
