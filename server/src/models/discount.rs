// server/src/models/discount.rs

use crate::models::money;
use crate::services::discount_engine::DiscountRule;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiscountCode {
  pub id: i64,
  pub code: String,
  /// Whole percent when `is_percent`, otherwise minor units.
  #[serde(skip_serializing)]
  pub amount: i64,
  pub is_percent: bool,
  #[serde(rename = "min_order_amount", with = "crate::models::money::option")]
  pub min_order_cents: Option<i64>,
  pub max_uses: Option<i32>,
  pub used_count: i32,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl DiscountCode {
  /// Percent, or the fixed amount as a decimal.
  pub fn display_amount(&self) -> f64 {
    display_amount(self.amount, self.is_percent)
  }

  pub fn into_rule(self, eligible_item_ids: impl IntoIterator<Item = i64>) -> DiscountRule {
    DiscountRule {
      id: self.id,
      code: self.code,
      amount: self.amount,
      is_percent: self.is_percent,
      min_order_cents: self.min_order_cents,
      start_date: self.start_date,
      end_date: self.end_date,
      is_active: self.is_active,
      eligible_item_ids: eligible_item_ids.into_iter().collect(),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LinkedMenuItem {
  pub id: i64,
  pub name: String,
}

pub fn display_amount(amount: i64, is_percent: bool) -> f64 {
  if is_percent {
    amount as f64
  } else {
    money::to_decimal(amount)
  }
}

/// Admin listing entry: the code plus the menu items it is restricted to.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountCodeWithItems {
  #[serde(flatten)]
  pub discount: DiscountCode,
  pub amount: f64,
  pub menu_items: Vec<LinkedMenuItem>,
}

impl DiscountCodeWithItems {
  pub fn new(discount: DiscountCode, menu_items: Vec<LinkedMenuItem>) -> Self {
    let amount = discount.display_amount();
    Self {
      discount,
      amount,
      menu_items,
    }
  }
}
