// server/src/services/email/mod.rs

//! Outbound email. SMTP delivery is external to this service: the bundled
//! transport logs each message and keeps a short in-memory outbox.

pub mod templates;

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub subject: String,
  pub html_body: String,
  pub reply_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub message_id: String,
  pub to: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: EmailMessage) -> AppResult<SentEmailInfo>;

  /// Address new-order notifications go to, if one is configured.
  fn operator_address(&self) -> Option<String>;
}

const OUTBOX_CAPACITY: usize = 200;

pub struct LogMailer {
  sender: Option<String>,
  password_configured: bool,
  operator: Option<String>,
  outbox: Mutex<VecDeque<EmailMessage>>,
}

impl LogMailer {
  pub fn new(sender: Option<String>, password_configured: bool, operator: Option<String>) -> Self {
    Self {
      sender,
      password_configured,
      operator,
      outbox: Mutex::new(VecDeque::new()),
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(
      config.email_user.clone(),
      config.email_password.is_some(),
      config.operator_email.clone(),
    )
  }

  /// Most recent messages, oldest first.
  pub fn sent(&self) -> Vec<EmailMessage> {
    self.outbox.lock().iter().cloned().collect()
  }
}

#[async_trait]
impl Mailer for LogMailer {
  #[instrument(name = "mailer::send", skip_all, fields(to = %message.to, subject = %message.subject))]
  async fn send(&self, message: EmailMessage) -> AppResult<SentEmailInfo> {
    let from = match (&self.sender, self.password_configured) {
      (Some(sender), true) => sender,
      _ => {
        warn!("Email configuration is missing; message not sent.");
        return Err(AppError::Email("Email configuration is missing (EMAIL_USER / EMAIL_PASSWORD)".to_string()));
      }
    };
    if message.to.trim().is_empty() {
      return Err(AppError::Email("Recipient address is empty".to_string()));
    }

    let message_id = format!("<{}@lokanta>", Uuid::new_v4());
    info!(%from, %message_id, body_len = message.html_body.len(), "Email dispatched.");

    let to = message.to.clone();
    let mut outbox = self.outbox.lock();
    if outbox.len() == OUTBOX_CAPACITY {
      outbox.pop_front();
    }
    outbox.push_back(message);

    Ok(SentEmailInfo { message_id, to })
  }

  fn operator_address(&self) -> Option<String> {
    self.operator.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn message(to: &str) -> EmailMessage {
    EmailMessage {
      to: to.to_string(),
      subject: "Sipariş Onayı #1".to_string(),
      html_body: "<p>ok</p>".to_string(),
      reply_to: None,
    }
  }

  #[tokio::test]
  async fn missing_credentials_fail_explicitly() {
    let mailer = LogMailer::new(Some("siparis@lokanta.app".into()), false, None);
    let err = mailer.send(message("a@b.co")).await.unwrap_err();
    assert!(matches!(err, AppError::Email(_)));
    assert!(mailer.sent().is_empty());
  }

  #[tokio::test]
  async fn configured_mailer_records_messages() {
    let mailer = LogMailer::new(Some("siparis@lokanta.app".into()), true, Some("mutfak@lokanta.app".into()));
    let info = mailer.send(message("a@b.co")).await.unwrap();
    assert_eq!(info.to, "a@b.co");
    assert_eq!(mailer.sent(), vec![message("a@b.co")]);
    assert_eq!(mailer.operator_address().as_deref(), Some("mutfak@lokanta.app"));
  }
}
