// server/src/web/handlers/maintenance_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db;
use crate::errors::AppError;
use crate::services::email::templates;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CleanPayload {
  #[serde(default)]
  pub table_name: String,
}

#[instrument(name = "handler::list_tables", skip_all, fields(admin_id = admin.0.id))]
pub async fn list_tables_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let tables = db::maintenance::list_tables(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "tables": tables })))
}

/// Empties one table, then tells every remaining user. Notices are best-effort.
#[instrument(name = "handler::clean_table", skip_all, fields(admin_id = admin.0.id, table = %req_payload.table_name))]
pub async fn clean_table_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<CleanPayload>,
) -> Result<HttpResponse, AppError> {
  let table_name = req_payload.table_name.trim();
  if table_name.is_empty() {
    return Err(AppError::Validation("No table selected.".to_string()));
  }
  let removed = db::maintenance::empty_table(&app_state.db_pool, table_name).await?;

  let recipients = db::users::all_emails(&app_state.db_pool).await?;
  let mut notified = 0usize;
  for to in &recipients {
    match app_state.mailer.send(templates::maintenance_notice(to, table_name)).await {
      Ok(_) => notified += 1,
      Err(e) => warn!(%to, error = %e, "Maintenance notice failed."),
    }
  }
  info!(removed, notified, recipients = recipients.len(), "Maintenance clean finished.");

  Ok(HttpResponse::Ok().json(json!({
    "message": format!("Data in table {} was deleted and users were notified.", table_name),
    "removed": removed,
    "notified": notified,
  })))
}
