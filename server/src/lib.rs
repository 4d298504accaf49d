// server/src/lib.rs

//! lokanta: a restaurant ordering service. Catalog, discount codes, paid
//! checkout, the admin order desk and customer messaging over one
//! PostgreSQL database.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::email::Mailer;
use crate::services::message_hub::MessageHub;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use lokanta_flow::Registry;
use sqlx::PgPool;
use std::sync::Arc;

/// Assembles the shared state and registers every pipeline on a fresh registry.
pub fn build_state(
  config: Arc<AppConfig>,
  db_pool: PgPool,
  payments: Arc<dyn PaymentGateway>,
  mailer: Arc<dyn Mailer>,
) -> AppState {
  let registry = Arc::new(Registry::<AppError>::new());
  let app_state = AppState {
    db_pool,
    registry: registry.clone(),
    config,
    payments,
    mailer,
    hub: MessageHub::default(),
  };
  pipelines::register_all_pipelines(&registry, &app_state);
  app_state
}
