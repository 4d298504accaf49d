// server/src/pipelines/finalize_pipeline.rs

//! Payment confirmation: turns a paid checkout session into an order.
//!
//! Replays are answered with the order already created for the session.
//! `orders.payment_session_id` is unique, so two concurrent confirmations
//! cannot both insert; the loser resolves to the winner's order.

use crate::db;
use crate::errors::AppError;
use crate::models::order::{payment_status, NewOrder};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{FinalizeCtxData, SendOrderEmailsCtxData};
use crate::services::discount_engine::Allocation;
use crate::services::payment::metadata_keys;
use crate::state::AppState;
use chrono::Utc;
use lokanta_flow::{ContextData, Pipeline, PipelineControl, Registry};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Payment status to record given what was charged and what the order is worth.
pub fn settle_payment_status(charged_cents: i64, recomputed_cents: i64) -> &'static str {
  if charged_cents == recomputed_cents {
    payment_status::PAID
  } else {
    payment_status::PAID_AMOUNT_MISMATCH
  }
}

/// Marks the context as a replay of an already finalized session when an order exists.
async fn resolve_existing(ctx_data: &ContextData<FinalizeCtxData>, pool: &PgPool, session_id: &str) -> Result<bool, AppError> {
  match db::orders::find_by_payment_session(pool, session_id).await? {
    Some(order) => {
      info!(order_id = order.id, %session_id, "Payment session already finalized.");
      ctx_data.update(|c| {
        c.order = Some(order);
        c.duplicate = true;
      });
      Ok(true)
    }
    None => Ok(false),
  }
}

pub fn register_finalize_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<FinalizeCtxData, AppError>::new(&[
    ("check_existing_order_finalize", false, None),
    ("retrieve_payment_session_finalize", false, None),
    ("load_temp_order_finalize", false, None),
    ("recompute_total_finalize", false, None),
    ("create_order_finalize", false, None),
    ("send_order_emails_finalize", true, None),
    ("delete_temp_order_finalize", true, None),
  ]);

  p.on_root("check_existing_order_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (session_id, pool) = ctx_data.snapshot(|c| (c.session_id.trim().to_string(), c.app_state.db_pool.clone()));
      if session_id.is_empty() {
        return Err(AppError::Validation("sessionId is required.".to_string()));
      }
      if resolve_existing(&ctx_data, &pool, &session_id).await? {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("retrieve_payment_session_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (session_id, payments) = ctx_data.snapshot(|c| (c.session_id.trim().to_string(), c.app_state.payments.clone()));
      let session = payments.retrieve_session(&session_id).await?;
      if !session.is_paid() {
        warn!(%session_id, status = %session.payment_status, "Confirmation for an unpaid session.");
        return Err(AppError::Payment("Payment has not been completed.".to_string()));
      }
      ctx_data.write().session = Some(session);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("load_temp_order_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (session_id, raw_id, pool) = ctx_data.snapshot(|c| {
        (
          c.session_id.trim().to_string(),
          c.session
            .as_ref()
            .and_then(|s| s.metadata_value(metadata_keys::TEMP_ORDER_ID))
            .map(str::to_string),
          c.app_state.db_pool.clone(),
        )
      });
      let temp_order_id = raw_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::Validation("Invalid order reference in payment session.".to_string()))?;

      // The session is paid, so a staged row past its expiry is still honoured.
      let staged = db::temp_orders::find(&pool, temp_order_id).await?;
      if let Some(t) = staged.as_ref().filter(|t| t.is_expired(Utc::now())) {
        info!(%temp_order_id, expired_at = %t.expires_at, "Finalizing a paid checkout staged past its expiry.");
      }

      let Some(staged) = staged else {
        // A concurrent confirmation may have consumed it already.
        if resolve_existing(&ctx_data, &pool, &session_id).await? {
          return Ok(PipelineControl::Stop);
        }
        return Err(AppError::NotFound("Staged order not found or expired.".to_string()));
      };

      if staged.cart_items.0.is_empty() || staged.customer_info.0.email.trim().is_empty() {
        return Err(AppError::Validation("Staged order has no customer email or items.".to_string()));
      }
      ctx_data.write().temp_order = Some(staged);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("recompute_total_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (staged, charged, pool) = ctx_data.snapshot(|c| {
        (
          c.temp_order.clone(),
          c.session.as_ref().map(|s| s.amount_total_cents),
          c.app_state.db_pool.clone(),
        )
      });
      let (Some(staged), Some(charged)) = (staged, charged) else {
        return Err(AppError::Internal("Finalize context incomplete before recompute.".to_string()));
      };

      let cart = &staged.cart_items.0;
      // The validity window is judged at the moment the customer was quoted.
      let allocation = match common_steps::allocate(&pool, staged.discount_code.as_deref(), cart, staged.created_at).await? {
        Ok(allocation) => allocation,
        Err(rejection) => {
          warn!(code = ?staged.discount_code, %rejection, "Staged discount no longer applies; pricing without it.");
          Allocation::undiscounted(cart)
        }
      };

      let status = settle_payment_status(charged, allocation.new_total_cents);
      if status != payment_status::PAID {
        warn!(
          temp_order_id = %staged.id,
          charged,
          recomputed = allocation.new_total_cents,
          "Charged amount differs from the recomputed total."
        );
      }
      ctx_data.update(|c| {
        c.allocation = Some(allocation);
        c.payment_status = status.to_string();
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_order_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (session_id, staged, allocation, status, pool) = ctx_data.snapshot(|c| {
        (
          c.session_id.trim().to_string(),
          c.temp_order.clone(),
          c.allocation.clone(),
          c.payment_status.clone(),
          c.app_state.db_pool.clone(),
        )
      });
      let (Some(staged), Some(allocation)) = (staged, allocation) else {
        return Err(AppError::Internal("Finalize context incomplete before order creation.".to_string()));
      };

      let new_order = NewOrder {
        user_id: staged.user_id,
        customer: staged.customer_info.0.clone(),
        total_cents: allocation.new_total_cents,
        discount_code: staged.discount_code.clone().filter(|_| allocation.discount_cents > 0),
        payment_status: status,
        payment_session_id: Some(session_id.clone()),
      };
      let items = common_steps::order_items(&allocation)?;

      match db::orders::insert_with_items(&pool, &new_order, &items).await {
        Ok(order) => {
          info!(order_id = order.id, %session_id, total = order.total_cents, "Order created from payment.");
          ctx_data.write().order = Some(order);
          Ok(PipelineControl::Continue)
        }
        Err(e) if db::is_unique_violation(&e) => {
          if resolve_existing(&ctx_data, &pool, &session_id).await? {
            return Ok(PipelineControl::Stop);
          }
          Err(AppError::Sqlx(e))
        }
        Err(e) => Err(AppError::Sqlx(e)),
      }
    })
  });

  p.on_root("send_order_emails_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let prepared = ctx_data.snapshot(|c| match (&c.order, &c.temp_order, &c.allocation) {
        (Some(order), Some(staged), Some(allocation)) => Some(SendOrderEmailsCtxData {
          app_state: c.app_state.clone(),
          order: order.clone(),
          customer: staged.customer_info.0.clone(),
          allocation: allocation.clone(),
        }),
        _ => None,
      });
      let Some(email_ctx) = prepared else {
        warn!("Order emails skipped: finalize context incomplete.");
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      let order_id = email_ctx.order.id;

      match common_steps::send_order_emails_step(ContextData::new(email_ctx)).await {
        Ok(_) => {
          ctx_data.write().emails_sent = true;
        }
        Err(e) => warn!(order_id, error = %e, "Order emails failed; order stands."),
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("delete_temp_order_finalize", |ctx_data: ContextData<FinalizeCtxData>| {
    Box::pin(async move {
      let (temp_order_id, pool) = ctx_data.snapshot(|c| (c.temp_order.as_ref().map(|t| t.id), c.app_state.db_pool.clone()));
      if let Some(id) = temp_order_id {
        if let Err(e) = db::temp_orders::delete(&pool, id).await {
          warn!(temp_order_id = %id, error = %e, "Staged checkout not deleted; the sweep will remove it.");
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Payment finalize pipeline registered.");
}
