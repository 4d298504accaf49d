// server/src/services/reaper.rs

//! Periodic removal of expired staged checkouts and login sessions.
//!
//! Session readers treat expired rows as absent, so for them the sweep only
//! bounds table growth. Staged checkouts are kept for a grace period past
//! their expiry: a hosted payment session may still be paid until then.

use crate::db;
use crate::errors::Result as AppResult;
use crate::services::payment::MAX_SESSION_LIFETIME_HOURS;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub temp_orders: u64,
  pub sessions: u64,
}

/// Staged checkouts that expired before this instant are removed.
pub fn staged_checkout_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
  now - chrono::Duration::hours(MAX_SESSION_LIFETIME_HOURS)
}

#[instrument(name = "reaper::sweep", skip(pool), err(Display))]
pub async fn sweep_once(pool: &PgPool, now: DateTime<Utc>) -> AppResult<SweepReport> {
  let report = SweepReport {
    temp_orders: db::temp_orders::delete_expired(pool, staged_checkout_cutoff(now)).await?,
    sessions: db::sessions::delete_expired(pool, now).await?,
  };
  if report.temp_orders > 0 || report.sessions > 0 {
    info!(temp_orders = report.temp_orders, sessions = report.sessions, "Expired rows removed.");
  } else {
    debug!("Nothing to sweep.");
  }
  Ok(report)
}

/// Runs [`sweep_once`] every `period` until the runtime shuts down.
pub fn spawn(pool: PgPool, period: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "Expiry sweep started.");
    loop {
      ticker.tick().await;
      if let Err(e) = sweep_once(&pool, Utc::now()).await {
        warn!(error = %e, "Expiry sweep failed; retrying next tick.");
      }
    }
  })
}
