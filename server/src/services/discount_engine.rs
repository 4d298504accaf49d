// server/src/services/discount_engine.rs

//! Discount validation and proportional allocation.
//!
//! `compute_discount` is pure: it is called with the same inputs when a
//! customer asks for a quote, when a checkout is staged and when a paid
//! checkout is finalized. Only the finalize-time result is persisted.
//!
//! All arithmetic is done in integer minor units. Divisions round half away
//! from zero, which matches rounding a decimal amount to two places.

use crate::models::money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One cart line as sent by the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
  pub id: i64,
  #[serde(rename = "price", with = "crate::models::money")]
  pub price_cents: i64,
  pub quantity: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

impl CartLine {
  pub fn line_total_cents(&self) -> i64 {
    self.price_cents.saturating_mul(self.quantity.max(0))
  }
}

#[derive(Debug, Clone)]
pub struct DiscountRule {
  pub id: i64,
  pub code: String,
  pub amount: i64,
  pub is_percent: bool,
  pub min_order_cents: Option<i64>,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub is_active: bool,
  /// Empty means every item is eligible.
  pub eligible_item_ids: HashSet<i64>,
}

impl DiscountRule {
  pub fn applies_to(&self, item_id: i64) -> bool {
    self.eligible_item_ids.is_empty() || self.eligible_item_ids.contains(&item_id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountRejection {
  NotFound,
  Inactive,
  OutsideWindow,
  BelowMinimum { min_order_cents: i64, eligible_cents: i64 },
}

impl fmt::Display for DiscountRejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DiscountRejection::NotFound | DiscountRejection::Inactive => {
        write!(f, "Discount code is invalid or inactive")
      }
      DiscountRejection::OutsideWindow => write!(f, "Discount code is not valid at this time"),
      DiscountRejection::BelowMinimum { min_order_cents, .. } => write!(
        f,
        "This discount code requires an order of at least {}₺",
        money::format_cents(*min_order_cents)
      ),
    }
  }
}

impl std::error::Error for DiscountRejection {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedLine {
  #[serde(flatten)]
  pub line: CartLine,
  pub discounted: bool,
  #[serde(skip_serializing_if = "Option::is_none", with = "crate::models::money::option")]
  pub original_price: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none", with = "crate::models::money::option")]
  pub discounted_price: Option<i64>,
}

impl AllocatedLine {
  fn unchanged(line: &CartLine) -> Self {
    Self {
      line: line.clone(),
      discounted: false,
      original_price: None,
      discounted_price: None,
    }
  }

  /// The unit price the customer pays for this line.
  pub fn unit_price_cents(&self) -> i64 {
    self.discounted_price.unwrap_or(self.line.price_cents)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
  pub original_total_cents: i64,
  pub eligible_total_cents: i64,
  pub new_total_cents: i64,
  /// `original_total_cents - new_total_cents`, after per-unit rounding.
  pub discount_cents: i64,
  pub lines: Vec<AllocatedLine>,
}

impl Allocation {
  /// The cart with no discount applied.
  pub fn undiscounted(cart: &[CartLine]) -> Self {
    let total = cart.iter().map(CartLine::line_total_cents).sum();
    Self {
      original_total_cents: total,
      eligible_total_cents: 0,
      new_total_cents: total,
      discount_cents: 0,
      lines: cart.iter().map(AllocatedLine::unchanged).collect(),
    }
  }
}

/// Validates `rule` against `cart` at `now` and allocates the discount.
///
/// Checks run in order and the first failure wins: the code exists, it is
/// active, `now` lies within its validity window, and the eligible subtotal
/// reaches the minimum order amount.
pub fn compute_discount(
  rule: Option<&DiscountRule>,
  cart: &[CartLine],
  now: DateTime<Utc>,
) -> Result<Allocation, DiscountRejection> {
  let rule = rule.ok_or(DiscountRejection::NotFound)?;
  if !rule.is_active {
    return Err(DiscountRejection::Inactive);
  }
  if now < rule.start_date || now > rule.end_date {
    return Err(DiscountRejection::OutsideWindow);
  }

  let eligible_total_cents: i64 = cart
    .iter()
    .filter(|line| rule.applies_to(line.id))
    .map(CartLine::line_total_cents)
    .sum();

  if let Some(min_order_cents) = rule.min_order_cents.filter(|m| *m > 0) {
    if eligible_total_cents < min_order_cents {
      return Err(DiscountRejection::BelowMinimum {
        min_order_cents,
        eligible_cents: eligible_total_cents,
      });
    }
  }

  let raw_discount = if rule.is_percent {
    div_round(eligible_total_cents as i128 * rule.amount as i128, 100)
  } else {
    rule.amount as i128
  };
  let total_discount = raw_discount.clamp(0, eligible_total_cents as i128);

  let lines: Vec<AllocatedLine> = cart
    .iter()
    .map(|line| {
      if !rule.applies_to(line.id) || eligible_total_cents == 0 || line.quantity <= 0 {
        return AllocatedLine::unchanged(line);
      }
      let item_total = line.line_total_cents() as i128;
      let share = div_round(item_total * total_discount, eligible_total_cents as i128);
      let unit = div_round(item_total - share, line.quantity as i128);
      AllocatedLine {
        line: line.clone(),
        discounted: true,
        original_price: Some(line.price_cents),
        discounted_price: Some(unit as i64),
      }
    })
    .collect();

  let original_total_cents: i64 = cart.iter().map(CartLine::line_total_cents).sum();
  let new_total_cents: i64 = lines
    .iter()
    .map(|l| l.unit_price_cents().saturating_mul(l.line.quantity.max(0)))
    .sum();

  Ok(Allocation {
    original_total_cents,
    eligible_total_cents,
    new_total_cents,
    discount_cents: original_total_cents - new_total_cents,
    lines,
  })
}

/// Integer division rounding half away from zero. `d` must be positive.
fn div_round(n: i128, d: i128) -> i128 {
  if n >= 0 {
    (n + d / 2) / d
  } else {
    -((-n + d / 2) / d)
  }
}
