// server/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{
  admin_user_handlers, auth_handlers, banner_handlers, catalog_handlers, checkout_handlers, discount_handlers,
  maintenance_handlers, message_handlers, order_handlers, upload_handlers, user_handlers,
};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies, query strings and path ids answer 400 in the usual error shape.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into()),
    )
    .app_data(
      web::PathConfig::default().error_handler(|_err, _req| AppError::Validation("Invalid id.".to_string()).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // Identity
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/admin/login", web::post().to(auth_handlers::admin_login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler)),
      )
      .service(
        web::scope("/user")
          .route("/info", web::get().to(user_handlers::user_info_handler))
          .route("/update", web::put().to(user_handlers::update_profile_handler))
          .route("/orders", web::get().to(user_handlers::user_orders_handler)),
      )
      .route("/users/list", web::get().to(user_handlers::list_users_handler))
      // Catalog
      .service(
        web::scope("/categories")
          .route("", web::get().to(catalog_handlers::list_categories_handler))
          .route("", web::post().to(catalog_handlers::create_category_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_category_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_category_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_category_handler)),
      )
      .service(
        web::scope("/menu")
          .route("", web::get().to(catalog_handlers::list_menu_handler))
          .route("", web::post().to(catalog_handlers::create_menu_item_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_menu_item_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_menu_item_handler)),
      )
      // Discounts
      .service(
        web::scope("/discount")
          .route("/validate", web::post().to(discount_handlers::validate_discount_handler))
          .route("", web::get().to(discount_handlers::list_discounts_handler))
          .route("", web::post().to(discount_handlers::create_discount_handler))
          .route("", web::put().to(discount_handlers::update_discount_handler))
          .route("", web::delete().to(discount_handlers::delete_discount_handler)),
      )
      // Ordering
      .service(
        web::scope("/checkout")
          .route("", web::post().to(checkout_handlers::start_checkout_handler))
          .route("/success", web::post().to(checkout_handlers::checkout_success_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(user_handlers::user_orders_handler))
          .route("", web::post().to(order_handlers::place_order_handler)),
      )
      // Admin
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(order_handlers::list_orders_handler))
          .route("/orders/{id}", web::get().to(order_handlers::get_order_handler))
          .route("/orders/{id}", web::patch().to(order_handlers::update_order_status_handler))
          .route("/orders/{id}", web::delete().to(order_handlers::delete_order_handler))
          .route("/orders/{id}/items", web::get().to(order_handlers::order_items_handler))
          .route("/orders/{id}/status", web::patch().to(order_handlers::update_order_status_handler))
          .route("/users", web::get().to(admin_user_handlers::list_users_handler))
          .route("/users", web::post().to(admin_user_handlers::create_user_handler))
          .route("/users/{id}", web::delete().to(admin_user_handlers::delete_user_handler))
          .route("/users/{id}/role", web::patch().to(admin_user_handlers::update_role_handler))
          .route("/change-password", web::post().to(admin_user_handlers::change_password_handler))
          .route("/change-email", web::post().to(admin_user_handlers::change_email_handler)),
      )
      // Banners: `/all` is registered before `/{id}`.
      .service(
        web::scope("/banners")
          .route("", web::get().to(banner_handlers::list_active_banners_handler))
          .route("", web::post().to(banner_handlers::create_banner_handler))
          .route("/all", web::get().to(banner_handlers::list_all_banners_handler))
          .route("/{id}", web::get().to(banner_handlers::get_banner_handler))
          .route("/{id}", web::put().to(banner_handlers::update_banner_handler))
          .route("/{id}", web::delete().to(banner_handlers::delete_banner_handler)),
      )
      .route("/upload", web::post().to(upload_handlers::upload_handler))
      // Messaging
      .service(
        web::scope("/messages")
          .route("/forum", web::get().to(message_handlers::forum_messages_handler))
          .route("/forum", web::post().to(message_handlers::post_forum_message_handler))
          .route("/direct", web::get().to(message_handlers::direct_messages_handler))
          .route("/direct", web::post().to(message_handlers::post_direct_message_handler))
          .route("/unread-counts", web::get().to(message_handlers::unread_counts_handler))
          .route("/stream", web::get().to(message_handlers::message_stream_handler)),
      )
      // Maintenance
      .route("/clean", web::get().to(maintenance_handlers::list_tables_handler))
      .route("/clean", web::post().to(maintenance_handlers::clean_table_handler)),
  );
}
