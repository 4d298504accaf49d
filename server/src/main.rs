// server/src/main.rs

use lokanta::config::AppConfig;
use lokanta::services::email::LogMailer;
use lokanta::services::{auth_service, payment, reaper};

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting lokanta server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let db_pool = match PgPoolOptions::new().max_connections(10).connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
    }
  };

  if app_config.run_migrations {
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
      tracing::error!(error = %e, "Database migrations failed.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
    tracing::info!("Database migrations applied.");
  }

  if let Err(e) = auth_service::ensure_bootstrap_admin(&db_pool, &app_config).await {
    tracing::error!(error = %e, "Failed to create the bootstrap admin.");
    return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
  }

  let payments = match payment::gateway_from_config(&app_config) {
    Ok(gateway) => gateway,
    Err(e) => {
      tracing::error!(error = %e, "Failed to set up the payment gateway.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  let mailer = Arc::new(LogMailer::from_config(&app_config));

  let app_state = lokanta::build_state(app_config.clone(), db_pool.clone(), payments, mailer);
  tracing::info!("Pipelines registered.");

  let _sweeper = reaper::spawn(db_pool, Duration::from_secs(app_config.temp_order_sweep_secs));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(lokanta::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
