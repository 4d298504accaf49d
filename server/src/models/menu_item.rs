// server/src/models/menu_item.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Label shown for menu items whose category was removed.
pub const UNCATEGORIZED_LABEL: &str = "Kategorisiz";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuItem {
  pub id: i64,
  pub name: String,
  pub description: String,
  #[serde(rename = "price", with = "crate::models::money")]
  pub price_cents: i64,
  pub image_url: String,
  pub category_id: Option<i64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Menu listing row joined with its category name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuItemWithCategory {
  pub id: i64,
  pub name: String,
  pub description: String,
  #[serde(rename = "price", with = "crate::models::money")]
  pub price_cents: i64,
  pub image_url: String,
  pub category_id: Option<i64>,
  #[serde(serialize_with = "serialize_category_name")]
  pub category_name: Option<String>,
}

fn serialize_category_name<S: serde::Serializer>(name: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(name.as_deref().unwrap_or(UNCATEGORIZED_LABEL))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_category_serializes_as_uncategorized() {
    let item = MenuItemWithCategory {
      id: 4,
      name: "Mercimek Çorbası".into(),
      description: String::new(),
      price_cents: 8550,
      image_url: String::new(),
      category_id: None,
      category_name: None,
    };
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["category_name"], "Kategorisiz");
    assert_eq!(json["category_id"], serde_json::Value::Null);
    assert_eq!(json["price"], 85.5);
  }
}
