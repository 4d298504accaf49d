// server/src/db/mod.rs

//! Query functions grouped by table family. Every function takes the pool
//! (or an open connection when it must join a caller's transaction).

pub mod banners;
pub mod catalog;
pub mod discounts;
pub mod maintenance;
pub mod messages;
pub mod orders;
pub mod sessions;
pub mod temp_orders;
pub mod users;

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  match err {
    sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
    _ => false,
  }
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  match err {
    sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
    _ => false,
  }
}
