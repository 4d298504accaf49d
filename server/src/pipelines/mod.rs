// server/src/pipelines/mod.rs

//! Every multi-step business flow, registered with the shared registry.

use crate::errors::AppError;
use crate::state::AppState;
use lokanta_flow::Registry;
use std::sync::Arc;

pub mod common_steps;
pub mod contexts;

pub mod checkout_pipeline;
pub mod finalize_pipeline;
pub mod order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers all pipelines. Called once at startup.
pub fn register_all_pipelines(registry: &Arc<Registry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(registry, app_state);
  signin_pipeline::register_signin_pipeline(registry, app_state);
  checkout_pipeline::register_checkout_pipeline(registry, app_state);
  finalize_pipeline::register_finalize_pipeline(registry, app_state);
  order_pipeline::register_place_order_pipeline(registry, app_state);
  order_pipeline::register_order_status_pipeline(registry, app_state);

  tracing::info!("All application pipelines registered.");
}
