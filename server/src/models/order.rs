// server/src/models/order.rs

use crate::models::order_item::OrderItemDetail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Approved,
  Cancelled,
}

impl OrderStatus {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim() {
      "pending" => Some(OrderStatus::Pending),
      "approved" => Some(OrderStatus::Approved),
      "cancelled" => Some(OrderStatus::Cancelled),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Approved => "approved",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// True only on the transition into `cancelled`.
  pub fn enters_cancelled(previous: OrderStatus, next: OrderStatus) -> bool {
    previous != OrderStatus::Cancelled && next == OrderStatus::Cancelled
  }
}

pub mod payment_status {
  pub const PAID: &str = "paid";
  pub const UNPAID: &str = "unpaid";
  pub const PAID_AMOUNT_MISMATCH: &str = "paid_amount_mismatch";
}

/// Customer snapshot submitted at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub note: Option<String>,
}

impl CustomerInfo {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub user_id: Option<i64>,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub note: Option<String>,
  #[serde(rename = "total_amount", with = "crate::models::money")]
  pub total_cents: i64,
  pub discount_code: Option<String>,
  pub status: OrderStatus,
  pub payment_status: String,
  pub payment_session_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemDetail>,
}

/// Row written when an order is created.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Option<i64>,
  pub customer: CustomerInfo,
  pub total_cents: i64,
  pub discount_code: Option<String>,
  pub payment_status: String,
  pub payment_session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub menu_item_id: i64,
  pub quantity: i32,
  pub price_cents: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancellation_is_detected_only_on_transition() {
    assert!(OrderStatus::enters_cancelled(OrderStatus::Pending, OrderStatus::Cancelled));
    assert!(OrderStatus::enters_cancelled(OrderStatus::Approved, OrderStatus::Cancelled));
    assert!(!OrderStatus::enters_cancelled(OrderStatus::Cancelled, OrderStatus::Cancelled));
    assert!(!OrderStatus::enters_cancelled(OrderStatus::Pending, OrderStatus::Approved));
  }

  #[test]
  fn status_parsing_is_enum_validated() {
    assert_eq!(OrderStatus::parse("approved"), Some(OrderStatus::Approved));
    assert_eq!(OrderStatus::parse("shipped"), None);
    assert_eq!(OrderStatus::Cancelled.as_str(), "cancelled");
  }

  #[test]
  fn customer_info_reads_camel_case() {
    let info: CustomerInfo = serde_json::from_value(serde_json::json!({
      "firstName": "Ayşe",
      "lastName": "Yılmaz",
      "email": "ayse@example.com",
      "phone": "555",
      "address": "Kadıköy"
    }))
    .unwrap();
    assert_eq!(info.full_name(), "Ayşe Yılmaz");
    assert_eq!(info.note, None);
  }
}
