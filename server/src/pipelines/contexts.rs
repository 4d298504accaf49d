// server/src/pipelines/contexts.rs

//! Data structs the pipelines run over. Handlers receive them wrapped in
//! `lokanta_flow::ContextData`.

use crate::db::orders::StatusChange;
use crate::models::order::{CustomerInfo, Order, OrderStatus};
use crate::models::temp_order::TempOrder;
use crate::models::user::User;
use crate::services::discount_engine::{Allocation, CartLine};
use crate::services::payment::CheckoutSession;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// --- Identity ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub password: String,
  pub created_user: Option<User>,
  pub welcome_email_sent: bool,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  /// Admin flow: only `admin` accounts may sign in.
  pub admin_only: bool,
  pub user: Option<User>,
  pub session_token: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

// --- Ordering ---

/// Fields shared by every flow that turns a submitted cart into money.
#[derive(Clone, Debug, Default)]
pub struct CartSubmission {
  pub customer: CustomerInfo,
  pub cart: Vec<CartLine>,
  pub discount_code: Option<String>,
  pub user_id: Option<i64>,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub submission: CartSubmission,
  /// Cart lines repriced from the live menu.
  pub priced_cart: Vec<CartLine>,
  pub allocation: Option<Allocation>,
  pub temp_order_id: Option<Uuid>,
  pub staged_until: Option<DateTime<Utc>>,
  pub session: Option<CheckoutSession>,
}

#[derive(Clone)]
pub struct FinalizeCtxData {
  pub app_state: AppState,
  pub session_id: String,
  pub session: Option<CheckoutSession>,
  pub temp_order: Option<TempOrder>,
  pub allocation: Option<Allocation>,
  pub payment_status: String,
  pub order: Option<Order>,
  /// Set when the session was already finalized, by an earlier call or a concurrent one.
  pub duplicate: bool,
  pub emails_sent: bool,
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub submission: CartSubmission,
  pub priced_cart: Vec<CartLine>,
  pub allocation: Option<Allocation>,
  pub order: Option<Order>,
  pub email_warning: Option<String>,
}

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub order_id: i64,
  pub new_status: OrderStatus,
  pub change: Option<StatusChange>,
  pub cancellation_email_sent: bool,
}

impl OrderStatusCtxData {
  pub fn enters_cancelled(&self) -> bool {
    self
      .change
      .as_ref()
      .is_some_and(|c| OrderStatus::enters_cancelled(c.previous, c.order.status))
  }
}

// --- Shared step contexts ---

#[derive(Clone)]
pub struct SendOrderEmailsCtxData {
  pub app_state: AppState,
  pub order: Order,
  pub customer: CustomerInfo,
  pub allocation: Allocation,
}
