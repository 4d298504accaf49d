// server/src/web/handlers/discount_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::db;
use crate::db::discounts::DiscountFields;
use crate::errors::AppError;
use crate::models::{discount, money};
use crate::pipelines::common_steps;
use crate::services::discount_engine::{compute_discount, CartLine};
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::parse;
use chrono::Utc;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPayload {
  #[serde(default)]
  pub id: Value,
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub amount: Value,
  #[serde(default)]
  pub is_percent: Option<bool>,
  #[serde(default)]
  pub min_order_amount: Value,
  #[serde(default)]
  pub max_uses: Value,
  #[serde(default)]
  pub start_date: Option<String>,
  #[serde(default)]
  pub end_date: Option<String>,
  #[serde(default)]
  pub is_active: Option<bool>,
  #[serde(default)]
  pub menu_item_ids: Value,
}

#[derive(Deserialize, Debug)]
pub struct DeleteDiscountQuery {
  pub id: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscountPayload {
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub cart_items: Option<Vec<CartLine>>,
}

/// Converts the admin form into stored fields. Percent amounts are whole
/// percents; fixed amounts are stored in minor units.
fn discount_fields(payload: &DiscountPayload) -> Result<DiscountFields, AppError> {
  let code = payload.code.trim().to_string();
  let (Some(start_raw), Some(end_raw)) = (payload.start_date.as_deref(), payload.end_date.as_deref()) else {
    return Err(AppError::Validation("Code, amount, start date and end date are required.".to_string()));
  };
  if code.is_empty() || !payload.amount.is_number() || start_raw.trim().is_empty() || end_raw.trim().is_empty() {
    return Err(AppError::Validation("Code, amount, start date and end date are required.".to_string()));
  }

  let is_percent = payload.is_percent.unwrap_or(true);
  let amount = if is_percent {
    parse::integer(&payload.amount, "amount")?
      .filter(|a| (1..=100).contains(a))
      .ok_or_else(|| AppError::Validation("Percent discounts must be a whole number from 1 to 100.".to_string()))?
  } else {
    parse::amount_cents(&payload.amount, "amount")?
      .filter(|a| *a > 0)
      .ok_or_else(|| AppError::Validation("Fixed discounts must be a positive amount.".to_string()))?
  };

  let start_date = parse::datetime(start_raw, "startDate")?;
  let end_date = parse::datetime(end_raw, "endDate")?;
  if end_date < start_date {
    return Err(AppError::Validation("End date must not be before start date.".to_string()));
  }

  let max_uses = parse::integer(&payload.max_uses, "maxUses")?
    .map(|v| i32::try_from(v).map_err(|_| AppError::Validation("Invalid value for 'maxUses'.".to_string())))
    .transpose()?;

  Ok(DiscountFields {
    code,
    amount,
    is_percent,
    min_order_cents: parse::amount_cents(&payload.min_order_amount, "minOrderAmount")?,
    max_uses,
    start_date,
    end_date,
    is_active: payload.is_active.unwrap_or(true),
    menu_item_ids: parse::id_list(&payload.menu_item_ids),
  })
}

#[instrument(name = "handler::list_discounts", skip_all, fields(admin_id = admin.0.id))]
pub async fn list_discounts_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let codes = db::discounts::list_with_items(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(codes))
}

#[instrument(name = "handler::create_discount", skip_all, fields(admin_id = admin.0.id, code = %req_payload.code))]
pub async fn create_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<DiscountPayload>,
) -> Result<HttpResponse, AppError> {
  let fields = discount_fields(&req_payload)?;
  let pool = &app_state.db_pool;
  if db::discounts::code_taken(pool, &fields.code, None).await? {
    return Err(AppError::Validation("This discount code already exists.".to_string()));
  }
  let id = match db::discounts::insert(pool, &fields).await {
    Ok(id) => id,
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::Validation("This discount code already exists.".to_string()));
    }
    Err(e) => return Err(e.into()),
  };
  info!(discount_id = id, linked_items = fields.menu_item_ids.len(), "Discount code created.");

  let created = db::discounts::find(pool, id)
    .await?
    .ok_or_else(|| AppError::Internal("Created discount code could not be read back.".to_string()))?;
  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::update_discount", skip_all, fields(admin_id = admin.0.id))]
pub async fn update_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<DiscountPayload>,
) -> Result<HttpResponse, AppError> {
  let id = parse::integer(&req_payload.id, "id")?
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation("Discount code id is required.".to_string()))?;
  let fields = discount_fields(&req_payload)?;
  let pool = &app_state.db_pool;
  if db::discounts::code_taken(pool, &fields.code, Some(id)).await? {
    return Err(AppError::Validation("This discount code already exists.".to_string()));
  }
  match db::discounts::update(pool, id, &fields).await {
    Ok(true) => {}
    Ok(false) => return Err(AppError::NotFound("Discount code not found.".to_string())),
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::Validation("This discount code already exists.".to_string()));
    }
    Err(e) => return Err(e.into()),
  }
  info!(discount_id = id, "Discount code updated.");

  let updated = db::discounts::find(pool, id)
    .await?
    .ok_or_else(|| AppError::NotFound("Discount code not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(updated))
}

#[instrument(name = "handler::delete_discount", skip_all, fields(admin_id = admin.0.id))]
pub async fn delete_discount_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<DeleteDiscountQuery>,
) -> Result<HttpResponse, AppError> {
  let id = query
    .id
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation("Discount code id is required.".to_string()))?;
  if !db::discounts::delete(&app_state.db_pool, id).await? {
    return Err(AppError::NotFound("Discount code not found.".to_string()));
  }
  info!(discount_id = id, "Discount code deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Discount code deleted." })))
}

fn invalid_quote(message: impl Into<String>) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "valid": false, "message": message.into() }))
}

/// Quotes a code against a cart. Every rejection is reported as
/// `{valid: false, message}` rather than an error status.
#[instrument(name = "handler::validate_discount", skip_all)]
pub async fn validate_discount_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ValidateDiscountPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let (Some(code), Some(cart)) = (common_steps::normalized_code(payload.code.as_deref()), payload.cart_items) else {
    return Ok(invalid_quote("Invalid request."));
  };
  let pool = &app_state.db_pool;

  let priced = match common_steps::price_cart(pool, &cart).await {
    Ok(priced) => priced,
    Err(AppError::Validation(message)) => return Ok(invalid_quote(message)),
    Err(e) => return Err(e),
  };
  let rule = db::discounts::find_rule_by_code(pool, &code).await?;
  let allocation = match compute_discount(rule.as_ref(), &priced, Utc::now()) {
    Ok(allocation) => allocation,
    Err(rejection) => {
      warn!(%code, %rejection, "Discount quote rejected.");
      return Ok(invalid_quote(rejection.to_string()));
    }
  };
  let Some(rule) = rule else {
    return Ok(invalid_quote("Discount code is invalid or inactive"));
  };

  info!(%code, discount = allocation.discount_cents, "Discount quoted.");
  Ok(HttpResponse::Ok().json(json!({
    "valid": true,
    "newTotal": money::to_decimal(allocation.new_total_cents),
    "discountAmount": money::to_decimal(allocation.discount_cents),
    "discountedItems": allocation.lines,
    "discountCode": {
      "id": rule.id,
      "code": rule.code,
      "amount": discount::display_amount(rule.amount, rule.is_percent),
      "isPercent": rule.is_percent,
    },
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload(value: Value) -> DiscountPayload {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn percent_codes_store_whole_percents() {
    let fields = discount_fields(&payload(json!({
      "code": "SAVE10",
      "amount": 10,
      "startDate": "2024-01-01",
      "endDate": "2024-12-31",
      "minOrderAmount": "50",
      "maxUses": "",
      "menuItemIds": [2, "5"]
    })))
    .unwrap();
    assert_eq!(fields.amount, 10);
    assert!(fields.is_percent);
    assert!(fields.is_active);
    assert_eq!(fields.min_order_cents, Some(5000));
    assert_eq!(fields.max_uses, None);
    assert_eq!(fields.menu_item_ids, vec![2, 5]);
  }

  #[test]
  fn fixed_codes_store_minor_units() {
    let fields = discount_fields(&payload(json!({
      "code": "TWENTY",
      "amount": 20.5,
      "isPercent": false,
      "startDate": "2024-01-01",
      "endDate": "2024-12-31"
    })))
    .unwrap();
    assert_eq!(fields.amount, 2050);
    assert!(!fields.is_percent);
  }

  #[test]
  fn required_fields_are_enforced() {
    let missing_dates = discount_fields(&payload(json!({ "code": "X", "amount": 5 })));
    assert!(matches!(missing_dates, Err(AppError::Validation(_))));

    let string_amount = discount_fields(&payload(json!({
      "code": "X", "amount": "5", "startDate": "2024-01-01", "endDate": "2024-01-02"
    })));
    assert!(matches!(string_amount, Err(AppError::Validation(_))));

    let over_hundred = discount_fields(&payload(json!({
      "code": "X", "amount": 150, "startDate": "2024-01-01", "endDate": "2024-01-02"
    })));
    assert!(matches!(over_hundred, Err(AppError::Validation(_))));
  }
}
