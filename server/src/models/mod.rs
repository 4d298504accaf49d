// server/src/models/mod.rs

pub mod banner;
pub mod category;
pub mod discount;
pub mod menu_item;
pub mod message;
pub mod money;
pub mod order;
pub mod order_item;
pub mod session;
pub mod temp_order;
pub mod user;
