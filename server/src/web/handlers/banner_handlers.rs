// server/src/web/handlers/banner_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::db;
use crate::db::banners::BannerFields;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BannerPayload {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image_url: String,
  #[serde(default)]
  pub link_url: Option<String>,
  #[serde(default)]
  pub is_active: Option<bool>,
  #[serde(default)]
  pub order: Option<i32>,
}

impl BannerPayload {
  fn into_fields(self) -> Result<BannerFields, AppError> {
    let title = self.title.trim().to_string();
    let image_url = self.image_url.trim().to_string();
    if title.is_empty() || image_url.is_empty() {
      return Err(AppError::Validation("Title and image URL are required.".to_string()));
    }
    Ok(BannerFields {
      title,
      description: self.description.unwrap_or_default(),
      image_url,
      link_url: self.link_url.unwrap_or_default(),
      is_active: self.is_active.unwrap_or(true),
      display_order: self.order.unwrap_or(0),
    })
  }
}

fn banner_not_found() -> AppError {
  AppError::NotFound("Banner not found.".to_string())
}

pub async fn list_active_banners_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let banners = db::banners::list(&app_state.db_pool, true).await?;
  Ok(HttpResponse::Ok().json(banners))
}

#[instrument(name = "handler::list_all_banners", skip_all, fields(admin_id = admin.0.id))]
pub async fn list_all_banners_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let banners = db::banners::list(&app_state.db_pool, false).await?;
  Ok(HttpResponse::Ok().json(banners))
}

pub async fn get_banner_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let banner = db::banners::find(&app_state.db_pool, path.into_inner())
    .await?
    .ok_or_else(banner_not_found)?;
  Ok(HttpResponse::Ok().json(banner))
}

#[instrument(name = "handler::create_banner", skip_all, fields(admin_id = admin.0.id))]
pub async fn create_banner_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<BannerPayload>,
) -> Result<HttpResponse, AppError> {
  let fields = req_payload.into_inner().into_fields()?;
  let banner = db::banners::insert(&app_state.db_pool, &fields).await?;
  info!(banner_id = banner.id, "Banner created.");
  Ok(HttpResponse::Created().json(banner))
}

#[instrument(name = "handler::update_banner", skip_all, fields(admin_id = admin.0.id, banner_id = *path))]
pub async fn update_banner_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<BannerPayload>,
) -> Result<HttpResponse, AppError> {
  let fields = req_payload.into_inner().into_fields()?;
  let banner = db::banners::update(&app_state.db_pool, path.into_inner(), &fields)
    .await?
    .ok_or_else(banner_not_found)?;
  Ok(HttpResponse::Ok().json(banner))
}

#[instrument(name = "handler::delete_banner", skip_all, fields(admin_id = admin.0.id, banner_id = *path))]
pub async fn delete_banner_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  if !db::banners::delete(&app_state.db_pool, path.into_inner()).await? {
    return Err(banner_not_found());
  }
  info!("Banner deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Banner deleted successfully." })))
}
