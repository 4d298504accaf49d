// server/src/pipelines/order_pipeline.rs

//! Orders placed without online payment, and admin status changes.

use crate::db;
use crate::errors::AppError;
use crate::models::order::{payment_status, NewOrder};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{OrderStatusCtxData, PlaceOrderCtxData, SendOrderEmailsCtxData};
use crate::services::email::templates;
use crate::state::AppState;
use chrono::Utc;
use lokanta_flow::{skip_if, ContextData, Pipeline, PipelineControl, Registry};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_place_order_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("validate_order_input", false, None),
    ("price_cart_order", false, None),
    ("apply_discount_order", false, None),
    ("create_order_record", false, None),
    ("send_order_emails_order", true, None),
  ]);

  p.on_root("validate_order_input", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      common_steps::validate_submission(&guard.submission, false)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("price_cart_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (cart, pool) = ctx_data.snapshot(|c| (c.submission.cart.clone(), c.app_state.db_pool.clone()));
      let priced = common_steps::price_cart(&pool, &cart).await?;
      ctx_data.write().priced_cart = priced;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_discount_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (code, cart, pool) = ctx_data.snapshot(|c| {
        (
          c.submission.discount_code.clone(),
          c.priced_cart.clone(),
          c.app_state.db_pool.clone(),
        )
      });
      let allocation = common_steps::allocate_or_reject(&pool, code.as_deref(), &cart, Utc::now()).await?;
      ctx_data.write().allocation = Some(allocation);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_order_record", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (submission, allocation, pool) =
        ctx_data.snapshot(|c| (c.submission.clone(), c.allocation.clone(), c.app_state.db_pool.clone()));
      let allocation = allocation.ok_or_else(|| AppError::Internal("Order total missing before insert.".to_string()))?;

      let new_order = NewOrder {
        user_id: submission.user_id,
        customer: submission.customer,
        total_cents: allocation.new_total_cents,
        discount_code: submission.discount_code.filter(|_| allocation.discount_cents > 0),
        payment_status: payment_status::UNPAID.to_string(),
        payment_session_id: None,
      };
      let items = common_steps::order_items(&allocation)?;
      let order = db::orders::insert_with_items(&pool, &new_order, &items).await?;
      info!(order_id = order.id, total = order.total_cents, "Order placed.");

      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("send_order_emails_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let prepared = ctx_data.snapshot(|c| match (&c.order, &c.allocation) {
        (Some(order), Some(allocation)) => Some(SendOrderEmailsCtxData {
          app_state: c.app_state.clone(),
          order: order.clone(),
          customer: c.submission.customer.clone(),
          allocation: allocation.clone(),
        }),
        _ => None,
      });
      let Some(email_ctx) = prepared else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      let order_id = email_ctx.order.id;

      if let Err(e) = common_steps::send_order_emails_step(ContextData::new(email_ctx)).await {
        warn!(order_id, error = %e, "Order saved but emails failed.");
        ctx_data.write().email_warning = Some(format!("Order saved but the email could not be sent: {}", e));
      }
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Place-order pipeline registered.");
}

pub fn register_order_status_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(&[
    ("update_order_status", false, None),
    (
      "send_cancellation_email",
      true,
      skip_if(|ctx_data: ContextData<OrderStatusCtxData>| !ctx_data.snapshot(|c| c.enters_cancelled())),
    ),
  ]);

  p.on_root("update_order_status", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let (order_id, status, pool) = ctx_data.snapshot(|c| (c.order_id, c.new_status, c.app_state.db_pool.clone()));
      let change = db::orders::update_status(&pool, order_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;
      info!(order_id, from = change.previous.as_str(), to = status.as_str(), "Order status updated.");
      ctx_data.write().change = Some(change);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("send_cancellation_email", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let (mailer, order) = ctx_data.snapshot(|c| (c.app_state.mailer.clone(), c.change.as_ref().map(|ch| ch.order.clone())));
      let Some(order) = order else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      if order.email.trim().is_empty() {
        warn!(order_id = order.id, "Cancelled order has no email address.");
        return Ok(PipelineControl::Continue);
      }

      let name = format!("{} {}", order.first_name, order.last_name);
      match mailer.send(templates::order_cancelled(order.id, &order.email, name.trim())).await {
        Ok(_) => {
          ctx_data.write().cancellation_email_sent = true;
        }
        Err(e) => warn!(order_id = order.id, error = %e, "Cancellation email failed."),
      }
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Order status pipeline registered.");
}
