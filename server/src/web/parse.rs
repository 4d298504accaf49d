// server/src/web/parse.rs

//! Lenient readers for admin form payloads, which send numbers either as
//! JSON numbers or as strings (an empty string meaning "unset").

use crate::errors::AppError;
use crate::models::money;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

fn invalid(field: &str) -> AppError {
  AppError::Validation(format!("Invalid value for '{}'.", field))
}

fn as_f64(value: &Value, field: &str) -> Result<Option<f64>, AppError> {
  match value {
    Value::Null => Ok(None),
    Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| invalid(field)),
    Value::String(s) if s.trim().is_empty() => Ok(None),
    Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| invalid(field)),
    _ => Err(invalid(field)),
  }
}

/// A decimal amount in minor units. Blank or null is `None`.
pub fn amount_cents(value: &Value, field: &str) -> Result<Option<i64>, AppError> {
  match as_f64(value, field)? {
    None => Ok(None),
    Some(v) => money::to_cents(v).map(Some).ok_or_else(|| invalid(field)),
  }
}

/// A whole number. Blank or null is `None`; fractions are rejected.
pub fn integer(value: &Value, field: &str) -> Result<Option<i64>, AppError> {
  match as_f64(value, field)? {
    None => Ok(None),
    Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
    Some(_) => Err(invalid(field)),
  }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) or a bare date at midnight UTC.
pub fn datetime(raw: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return Ok(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
    .ok_or_else(|| invalid(field))
}

/// Numeric ids from an array; entries that are not numbers are dropped.
pub fn id_list(value: &Value) -> Vec<i64> {
  let Some(items) = value.as_array() else {
    return Vec::new();
  };
  let mut ids: Vec<i64> = items
    .iter()
    .filter_map(|v| match v {
      Value::Number(n) => n.as_i64(),
      Value::String(s) => s.trim().parse::<i64>().ok(),
      _ => None,
    })
    .collect();
  ids.sort_unstable();
  ids.dedup();
  ids
}
