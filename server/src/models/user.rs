// server/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  User,
  Admin,
}

impl UserRole {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim() {
      "user" => Some(UserRole::User),
      "admin" => Some(UserRole::Admin),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: UserRole,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }
}

/// Public directory entry used to start direct conversations.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
  pub id: i64,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

/// Fields accepted when a user is created, by registration or by an admin.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub password_hash: String,
  pub role: UserRole,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_parsing_accepts_only_known_roles() {
    assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
    assert_eq!(UserRole::parse(" user "), Some(UserRole::User));
    assert_eq!(UserRole::parse("root"), None);
  }
}
