// server/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::email::Mailer;
use crate::services::message_hub::MessageHub;
use crate::services::payment::PaymentGateway;
use lokanta_flow::Registry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub payments: Arc<dyn PaymentGateway>,
  pub mailer: Arc<dyn Mailer>,
  pub hub: MessageHub,
}
