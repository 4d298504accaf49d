// server/src/db/maintenance.rs

//! Table listing and emptying for the admin clean-up screen.

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

const HIDDEN_TABLES: [&str; 1] = ["_sqlx_migrations"];

/// Application tables in the public schema, alphabetically.
pub async fn list_tables(pool: &PgPool) -> AppResult<Vec<String>> {
  let tables = sqlx::query_scalar::<_, String>(
    "SELECT table_name::TEXT FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name",
  )
  .fetch_all(pool)
  .await?;
  Ok(tables.into_iter().filter(|t| !HIDDEN_TABLES.contains(&t.as_str())).collect())
}

fn quote_ident(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}

/// Empties `table_name`, which must be one of [`list_tables`]. Only that
/// table's rows are removed:
/// - `users` keeps admin accounts;
/// - `categories` first detaches its menu items;
/// - any other table still referenced by rows elsewhere is refused with a
///   conflict and left untouched.
pub async fn empty_table(pool: &PgPool, table_name: &str) -> AppResult<u64> {
  let tables = list_tables(pool).await?;
  if !tables.iter().any(|t| t == table_name) {
    warn!(table_name, "Refusing to empty unknown table.");
    return Err(AppError::Validation("Invalid table name.".to_string()));
  }

  let mut tx = pool.begin().await?;
  if table_name == "categories" {
    sqlx::query("UPDATE menu_items SET category_id = NULL, updated_at = NOW() WHERE category_id IS NOT NULL")
      .execute(&mut *tx)
      .await?;
  }
  let statement = if table_name == "users" {
    "DELETE FROM users WHERE role <> 'admin'".to_string()
  } else {
    format!("DELETE FROM {}", quote_ident(table_name))
  };

  let affected = match sqlx::query(&statement).execute(&mut *tx).await {
    Ok(result) => result.rows_affected(),
    Err(e) if db::is_foreign_key_violation(&e) => {
      tx.rollback().await?;
      warn!(table_name, "Table is still referenced; nothing emptied.");
      return Err(AppError::conflict(
        "This table cannot be emptied while other records refer to it.",
        json!({ "tableName": table_name }),
      ));
    }
    Err(e) => return Err(e.into()),
  };
  tx.commit().await?;
  info!(table_name, affected, "Table emptied.");
  Ok(affected)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifiers_are_quoted() {
    assert_eq!(quote_ident("orders"), "\"orders\"");
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
  }
}
