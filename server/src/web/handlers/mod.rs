// server/src/web/handlers/mod.rs

pub mod admin_user_handlers;
pub mod auth_handlers;
pub mod banner_handlers;
pub mod catalog_handlers;
pub mod checkout_handlers;
pub mod discount_handlers;
pub mod maintenance_handlers;
pub mod message_handlers;
pub mod order_handlers;
pub mod upload_handlers;
pub mod user_handlers;
