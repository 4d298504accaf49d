// server/src/pipelines/checkout_pipeline.rs

//! Checkout initiation: reprice the cart, recompute the discount, stage a
//! TempOrder and open a hosted payment session that points back at it.

use crate::db;
use crate::db::temp_orders::NewTempOrder;
use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::payment::{metadata_keys, session_expiry, CheckoutSessionRequest, SESSION_ID_PLACEHOLDER};
use crate::state::AppState;
use chrono::{Duration, Utc};
use lokanta_flow::{ContextData, Pipeline, PipelineControl, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub fn product_name(applied_code: Option<&str>) -> String {
  match applied_code {
    Some(code) => format!("İndirimli Sipariş ({})", code),
    None => "Toplam Sipariş".to_string(),
  }
}

pub fn success_url(app_base_url: &str) -> String {
  format!("{}/checkout/success?session_id={}", app_base_url, SESSION_ID_PLACEHOLDER)
}

pub fn cancel_url(app_base_url: &str) -> String {
  format!("{}/checkout/cancel", app_base_url)
}

pub fn register_checkout_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_input", false, None),
    ("price_cart_checkout", false, None),
    ("apply_discount_checkout", false, None),
    ("stage_temp_order_checkout", false, None),
    ("create_payment_session_checkout", false, None),
  ]);

  p.on_root("validate_checkout_input", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      common_steps::validate_submission(&guard.submission, true)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("price_cart_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (cart, pool) = ctx_data.snapshot(|c| (c.submission.cart.clone(), c.app_state.db_pool.clone()));
      let priced = common_steps::price_cart(&pool, &cart).await?;
      ctx_data.write().priced_cart = priced;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_discount_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (code, cart, pool) = ctx_data.snapshot(|c| {
        (
          c.submission.discount_code.clone(),
          c.priced_cart.clone(),
          c.app_state.db_pool.clone(),
        )
      });
      let allocation = common_steps::allocate_or_reject(&pool, code.as_deref(), &cart, Utc::now()).await?;
      if allocation.new_total_cents <= 0 {
        return Err(AppError::Validation("Order total must be greater than zero.".to_string()));
      }
      info!(
        original = allocation.original_total_cents,
        discount = allocation.discount_cents,
        total = allocation.new_total_cents,
        "Checkout total computed."
      );
      ctx_data.write().allocation = Some(allocation);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("stage_temp_order_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (submission, cart, allocation, pool, ttl_hours) = ctx_data.snapshot(|c| {
        (
          c.submission.clone(),
          c.priced_cart.clone(),
          c.allocation.clone(),
          c.app_state.db_pool.clone(),
          c.app_state.config.temp_order_ttl_hours,
        )
      });
      let allocation = allocation.ok_or_else(|| AppError::Internal("Checkout total missing before staging.".to_string()))?;

      let staged = db::temp_orders::insert(
        &pool,
        &NewTempOrder {
          id: Uuid::new_v4(),
          customer: submission.customer,
          cart,
          discount_code: submission.discount_code,
          user_id: submission.user_id,
          total_cents: allocation.new_total_cents,
          expires_at: Utc::now() + Duration::hours(ttl_hours),
        },
      )
      .await?;
      info!(temp_order_id = %staged.id, expires_at = %staged.expires_at, "Checkout staged.");
      ctx_data.update(|c| {
        c.temp_order_id = Some(staged.id);
        c.staged_until = Some(staged.expires_at);
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_payment_session_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, submission, allocation, temp_order_id, staged_until) = ctx_data.snapshot(|c| {
        (c.app_state.clone(), c.submission.clone(), c.allocation.clone(), c.temp_order_id, c.staged_until)
      });
      let (Some(allocation), Some(temp_order_id), Some(staged_until)) = (allocation, temp_order_id, staged_until) else {
        return Err(AppError::Internal("Checkout not staged before payment session.".to_string()));
      };

      let applied_code = submission.discount_code.as_deref().filter(|_| allocation.discount_cents > 0);
      let mut metadata = BTreeMap::new();
      metadata.insert(metadata_keys::TEMP_ORDER_ID.to_string(), temp_order_id.to_string());
      metadata.insert(
        metadata_keys::USER_ID.to_string(),
        submission.user_id.map(|id| id.to_string()).unwrap_or_default(),
      );
      if let Some(code) = submission.discount_code.as_deref() {
        metadata.insert(metadata_keys::DISCOUNT_CODE.to_string(), code.to_string());
      }

      let config = &app_state.config;
      let request = CheckoutSessionRequest {
        amount_cents: allocation.new_total_cents,
        currency: config.currency.clone(),
        customer_email: submission.customer.email.clone(),
        product_name: product_name(applied_code),
        metadata,
        success_url: success_url(&config.app_base_url),
        cancel_url: cancel_url(&config.app_base_url),
        expires_at: session_expiry(staged_until, Utc::now()),
      };

      let session = match app_state.payments.create_checkout_session(request).await {
        Ok(session) => session,
        Err(e) => {
          // The staged row is left for the expiry sweep.
          warn!(%temp_order_id, error = %e, "Payment session creation failed.");
          return Err(e);
        }
      };
      info!(%temp_order_id, session_id = %session.id, "Payment session created.");
      ctx_data.write().session = Some(session);
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Checkout pipeline registered.");
}
