// server/src/models/money.rs

//! Money travels as a decimal number in JSON and as integer minor units
//! everywhere else. Use with `#[serde(with = "crate::models::money")]`.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

pub fn to_cents(value: f64) -> Option<i64> {
  if !value.is_finite() {
    return None;
  }
  let cents = (value * 100.0).round();
  if cents.abs() > i64::MAX as f64 / 2.0 {
    return None;
  }
  Some(cents as i64)
}

pub fn to_decimal(cents: i64) -> f64 {
  cents as f64 / 100.0
}

/// `1250` → `"12.50"`.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(to_decimal(*cents))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
  let value = f64::deserialize(deserializer)?;
  to_cents(value).ok_or_else(|| D::Error::custom("amount is not a finite number"))
}

pub mod option {
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(cents: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match cents {
      Some(c) => serializer.serialize_some(&super::to_decimal(*c)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
      None => Ok(None),
      Some(v) => super::to_cents(v)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("amount is not a finite number")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decimal_amounts_round_to_nearest_cent() {
    assert_eq!(to_cents(12.5), Some(1250));
    assert_eq!(to_cents(0.1 + 0.2), Some(30));
    assert_eq!(to_cents(19.999), Some(2000));
    assert_eq!(to_cents(f64::NAN), None);
  }

  #[test]
  fn cents_format_with_two_decimals() {
    assert_eq!(format_cents(9000), "90.00");
    assert_eq!(format_cents(5), "0.05");
    assert_eq!(format_cents(-250), "-2.50");
  }
}
