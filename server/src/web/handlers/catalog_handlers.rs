// server/src/web/handlers/catalog_handlers.rs

//! Categories and menu items. Reads are public, writes are admin-only.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::db;
use crate::db::catalog::{MenuItemDeletion, MenuItemFields};
use crate::errors::AppError;
use crate::models::menu_item::{MenuItem, MenuItemWithCategory};
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::parse;

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MenuItemPayload {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub category_id: Value,
  #[serde(default)]
  pub price: Value,
  #[serde(default, rename = "imageUrl")]
  pub image_url: Option<String>,
}

// --- Categories ---

fn category_fields(payload: &CategoryPayload) -> Result<(String, String), AppError> {
  let name = payload.name.trim();
  if name.is_empty() {
    return Err(AppError::Validation("Category name is required.".to_string()));
  }
  Ok((name.to_string(), payload.description.clone().unwrap_or_default()))
}

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = db::catalog::list_categories(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(categories))
}

pub async fn get_category_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let category = db::catalog::find_category(&app_state.db_pool, path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Category not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::create_category", skip_all, fields(admin_id = admin.0.id))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let (name, description) = category_fields(&req_payload)?;
  let category = db::catalog::insert_category(&app_state.db_pool, &name, &description).await?;
  info!(category_id = category.id, "Category created.");
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::update_category", skip_all, fields(admin_id = admin.0.id, category_id = *path))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let (name, description) = category_fields(&req_payload)?;
  let category = db::catalog::update_category(&app_state.db_pool, path.into_inner(), &name, &description)
    .await?
    .ok_or_else(|| AppError::NotFound("Category not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::delete_category", skip_all, fields(admin_id = admin.0.id, category_id = *path))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  if !db::catalog::delete_category(&app_state.db_pool, path.into_inner()).await? {
    return Err(AppError::NotFound("Category not found.".to_string()));
  }
  info!("Category deleted; its menu items are now uncategorized.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Category deleted." })))
}

// --- Menu ---

/// Validates a menu item payload, including that its category exists.
async fn menu_item_fields(app_state: &AppState, payload: MenuItemPayload) -> Result<MenuItemFields, AppError> {
  let name = payload.name.trim().to_string();
  if name.is_empty() {
    return Err(AppError::Validation("Name is required.".to_string()));
  }
  let price_cents = parse::amount_cents(&payload.price, "price")?
    .filter(|p| *p >= 0)
    .ok_or_else(|| AppError::Validation("A valid price is required.".to_string()))?;
  let category_id = parse::integer(&payload.category_id, "category_id")?
    .ok_or_else(|| AppError::Validation("Category is required.".to_string()))?;
  if !db::catalog::category_exists(&app_state.db_pool, category_id).await? {
    warn!(category_id, "Menu item references a missing category.");
    return Err(AppError::Validation("The specified category does not exist.".to_string()));
  }
  Ok(MenuItemFields {
    name,
    description: payload.description.unwrap_or_default(),
    price_cents,
    image_url: payload.image_url.unwrap_or_default(),
    category_id: Some(category_id),
  })
}

async fn with_category(app_state: &AppState, item: MenuItem) -> Result<MenuItemWithCategory, AppError> {
  let category_name = match item.category_id {
    Some(id) => db::catalog::find_category(&app_state.db_pool, id).await?.map(|c| c.name),
    None => None,
  };
  Ok(MenuItemWithCategory {
    id: item.id,
    name: item.name,
    description: item.description,
    price_cents: item.price_cents,
    image_url: item.image_url,
    category_id: item.category_id,
    category_name,
  })
}

pub async fn list_menu_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let items = db::catalog::list_menu(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::create_menu_item", skip_all, fields(admin_id = admin.0.id))]
pub async fn create_menu_item_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<MenuItemPayload>,
) -> Result<HttpResponse, AppError> {
  let fields = menu_item_fields(&app_state, req_payload.into_inner()).await?;
  let item = db::catalog::insert_menu_item(&app_state.db_pool, &fields).await?;
  info!(menu_item_id = item.id, price = item.price_cents, "Menu item created.");
  Ok(HttpResponse::Created().json(with_category(&app_state, item).await?))
}

#[instrument(name = "handler::update_menu_item", skip_all, fields(admin_id = admin.0.id, menu_item_id = *path))]
pub async fn update_menu_item_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<MenuItemPayload>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  if db::catalog::find_menu_item(&app_state.db_pool, id).await?.is_none() {
    return Err(AppError::NotFound("Menu item not found.".to_string()));
  }
  let fields = menu_item_fields(&app_state, req_payload.into_inner()).await?;
  let item = db::catalog::update_menu_item(&app_state.db_pool, id, &fields)
    .await?
    .ok_or_else(|| AppError::NotFound("Menu item not found.".to_string()))?;
  info!(price = item.price_cents, "Menu item updated.");
  Ok(HttpResponse::Ok().json(with_category(&app_state, item).await?))
}

#[instrument(name = "handler::delete_menu_item", skip_all, fields(admin_id = admin.0.id, menu_item_id = *path))]
pub async fn delete_menu_item_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  match db::catalog::delete_menu_item(&app_state.db_pool, path.into_inner()).await? {
    MenuItemDeletion::Deleted => {
      info!("Menu item deleted.");
      Ok(HttpResponse::Ok().json(json!({ "message": "Menu item deleted." })))
    }
    MenuItemDeletion::NotFound => Err(AppError::NotFound("Menu item not found.".to_string())),
    MenuItemDeletion::Referenced(order_ids) => {
      warn!(order_count = order_ids.len(), "Menu item delete blocked by existing orders.");
      Err(AppError::conflict(
        "This menu item cannot be deleted because it is used in orders.",
        json!({ "orderIds": order_ids, "orderCount": order_ids.len() }),
      ))
    }
  }
}
