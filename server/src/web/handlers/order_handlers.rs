// server/src/web/handlers/order_handlers.rs

//! Direct orders and the admin order desk.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::order::OrderStatus;
use crate::pipelines::contexts::{OrderStatusCtxData, PlaceOrderCtxData};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, MaybeUser};
use crate::web::handlers::checkout_handlers::CartRequestPayload;
use lokanta_flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct StatusPayload {
  #[serde(default)]
  pub status: String,
}

#[instrument(
  name = "handler::place_order",
  skip_all,
  fields(user_id = ?maybe_user.0.as_ref().map(|u| u.id), lines = req_payload.cart_items.len())
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  maybe_user: MaybeUser,
  req_payload: web::Json<CartRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = maybe_user.0.as_ref().map(|u| u.id);
  let place_ctx_initial = PlaceOrderCtxData {
    app_state: app_state.get_ref().clone(),
    submission: req_payload.into_inner().into_submission(user_id),
    priced_cart: Vec::new(),
    allocation: None,
    order: None,
    email_warning: None,
  };
  let ctx_data = ContextData::new(place_ctx_initial);

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (order_id, warning) = ctx_data.snapshot(|c| (c.order.as_ref().map(|o| o.id), c.email_warning.clone()));
      let order_id = order_id.ok_or_else(|| AppError::Internal("Order pipeline completed without an order.".to_string()))?;
      let mut body = json!({ "success": true, "orderId": order_id });
      if let Some(warning) = warning {
        body["warning"] = json!(warning);
      }
      Ok(HttpResponse::Created().json(body))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Place-order pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

// --- Admin ---

#[instrument(name = "handler::admin_list_orders", skip_all, fields(admin_id = admin.0.id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let orders = db::orders::list_all(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_get_order", skip_all, fields(admin_id = admin.0.id, order_id = *path))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order = db::orders::find_with_items(&app_state.db_pool, path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::admin_order_items", skip_all, fields(admin_id = admin.0.id, order_id = *path))]
pub async fn order_items_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let pool = &app_state.db_pool;
  if db::orders::find(pool, order_id).await?.is_none() {
    return Err(AppError::NotFound("Order not found.".to_string()));
  }
  let items = db::orders::items_for(pool, order_id).await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::admin_update_order_status", skip_all, fields(admin_id = admin.0.id, order_id = *path))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
  let new_status = OrderStatus::parse(&req_payload.status).ok_or_else(|| {
    AppError::Validation("Invalid status. Expected one of: pending, approved, cancelled.".to_string())
  })?;
  let status_ctx_initial = OrderStatusCtxData {
    app_state: app_state.get_ref().clone(),
    order_id: path.into_inner(),
    new_status,
    change: None,
    cancellation_email_sent: false,
  };
  let ctx_data = ContextData::new(status_ctx_initial);

  match app_state.registry.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (order, email_sent) = ctx_data.snapshot(|c| (c.change.as_ref().map(|ch| ch.order.clone()), c.cancellation_email_sent));
      let order = order.ok_or_else(|| AppError::Internal("Status update completed without an order.".to_string()))?;
      info!(status = order.status.as_str(), email_sent, "Order status handled.");
      Ok(HttpResponse::Ok().json(order))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Order status pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::admin_delete_order", skip_all, fields(admin_id = admin.0.id, order_id = *path))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  if !db::orders::delete(&app_state.db_pool, path.into_inner()).await? {
    return Err(AppError::NotFound("Order not found.".to_string()));
  }
  info!("Order deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Order deleted." })))
}
