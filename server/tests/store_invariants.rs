// server/tests/store_invariants.rs

//! Ordering and catalog rules that only hold with a real database behind
//! them. Each test gets a fresh, migrated database.

mod common;

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use common::{count, seed_admin, seed_category, seed_menu_item, seed_order, test_app};
use lokanta::db;
use lokanta::db::catalog::MenuItemFields;
use lokanta::errors::AppError;
use lokanta::models::order::OrderStatus;
use lokanta::pipelines::contexts::OrderStatusCtxData;
use lokanta::services::reaper;
use lokanta_flow::{ContextData, PipelineResult};
use serde_json::{json, Value};
use sqlx::PgPool;

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state))
        .configure(lokanta::web::configure_app_routes),
    )
    .await
  };
}

fn cart(menu_item_id: i64, quantity: i64) -> Value {
  json!({
    "customerInfo": { "firstName": "Ayşe", "lastName": "Yılmaz", "email": "ayse@example.com" },
    "cartItems": [{ "id": menu_item_id, "price": 1.0, "quantity": quantity }]
  })
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_category_leaves_its_items_uncategorized(pool: PgPool) {
  let soups = seed_category(&pool, "Çorbalar").await;
  seed_menu_item(&pool, "Mercimek", 8_550, Some(soups)).await;
  seed_menu_item(&pool, "Ezogelin", 9_000, Some(soups)).await;

  assert!(db::catalog::delete_category(&pool, soups).await.unwrap());

  assert!(db::catalog::find_category(&pool, soups).await.unwrap().is_none());
  let menu = db::catalog::list_menu(&pool).await.unwrap();
  assert_eq!(menu.len(), 2);
  for item in &menu {
    assert_eq!(item.category_id, None);
    let json = serde_json::to_value(item).unwrap();
    assert_eq!(json["category_name"], "Kategorisiz");
  }
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_an_ordered_menu_item_conflicts_with_distinct_order_ids(pool: PgPool) {
  let kebab = seed_menu_item(&pool, "Adana Kebap", 25_000, None).await;
  let ayran = seed_menu_item(&pool, "Ayran", 2_000, None).await;
  let first = seed_order(&pool, &[(kebab, 1, 25_000), (kebab, 2, 25_000)]).await;
  let second = seed_order(&pool, &[(kebab, 1, 25_000), (ayran, 1, 2_000)]).await;
  let (_, token) = seed_admin(&pool, "admin@lokanta.app", "yonetici-sifre").await;
  let app = app!(test_app(pool.clone()).state);

  let req = test::TestRequest::delete()
    .uri(&format!("/api/menu/{}", kebab))
    .insert_header(("Authorization", format!("Bearer {}", token)))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["orderIds"], json!([first.id, second.id]));
  assert_eq!(body["orderCount"], 2);
  assert!(db::catalog::find_menu_item(&pool, kebab).await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn order_lines_keep_their_price_after_a_menu_change(pool: PgPool) {
  let pide = seed_menu_item(&pool, "Kaşarlı Pide", 10_000, None).await;
  let app = app!(test_app(pool.clone()).state);

  let req = test::TestRequest::post().uri("/api/orders").set_json(cart(pide, 2)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  let order_id = body["orderId"].as_i64().unwrap();

  let fields = MenuItemFields {
    name: "Kaşarlı Pide".to_string(),
    description: String::new(),
    price_cents: 15_000,
    image_url: String::new(),
    category_id: None,
  };
  db::catalog::update_menu_item(&pool, pide, &fields).await.unwrap();

  let order = db::orders::find(&pool, order_id).await.unwrap().unwrap();
  assert_eq!(order.total_cents, 20_000);
  let items = db::orders::items_for(&pool, order_id).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].price_cents, 10_000);
  assert_eq!(items[0].quantity, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn repeated_payment_confirmation_creates_one_order(pool: PgPool) {
  let lahmacun = seed_menu_item(&pool, "Lahmacun", 10_000, None).await;
  let test_app = test_app(pool.clone());
  let mailer = test_app.mailer.clone();
  let app = app!(test_app.state);

  let req = test::TestRequest::post().uri("/api/checkout").set_json(cart(lahmacun, 1)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let session_id = body["sessionId"].as_str().unwrap().to_string();

  let confirm = |session_id: &str| {
    test::TestRequest::post()
      .uri("/api/checkout/success")
      .set_json(json!({ "sessionId": session_id }))
      .to_request()
  };
  let resp = test::call_service(&app, confirm(&session_id)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let first: Value = test::read_body_json(resp).await;
  assert_eq!(first["duplicate"], false);
  assert_eq!(first["paymentStatus"], "paid");
  let emails_after_first = mailer.sent().len();
  assert!(emails_after_first > 0);

  let resp = test::call_service(&app, confirm(&session_id)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let second: Value = test::read_body_json(resp).await;
  assert_eq!(second["duplicate"], true);
  assert_eq!(second["orderId"], first["orderId"]);

  assert_eq!(count(&pool, "orders").await, 1);
  assert_eq!(count(&pool, "temp_orders").await, 0);
  assert_eq!(mailer.sent().len(), emails_after_first);
}

#[sqlx::test(migrations = "./migrations")]
async fn paid_checkout_is_finalized_after_its_staging_expired(pool: PgPool) {
  let manti = seed_menu_item(&pool, "Mantı", 18_000, None).await;
  let app = app!(test_app(pool.clone()).state);

  let req = test::TestRequest::post().uri("/api/checkout").set_json(cart(manti, 1)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let session_id = body["sessionId"].as_str().unwrap().to_string();

  sqlx::query("UPDATE temp_orders SET expires_at = NOW() - INTERVAL '1 hour'")
    .execute(&pool)
    .await
    .unwrap();
  let report = reaper::sweep_once(&pool, Utc::now()).await.unwrap();
  assert_eq!(report.temp_orders, 0);

  let req = test::TestRequest::post()
    .uri("/api/checkout/success")
    .set_json(json!({ "sessionId": session_id }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["duplicate"], false);

  let order = db::orders::find_by_payment_session(&pool, &session_id).await.unwrap().unwrap();
  assert_eq!(order.total_cents, 18_000);
}

#[sqlx::test(migrations = "./migrations")]
async fn staged_checkouts_are_swept_once_the_grace_period_passes(pool: PgPool) {
  let manti = seed_menu_item(&pool, "Mantı", 18_000, None).await;
  let app = app!(test_app(pool.clone()).state);

  let req = test::TestRequest::post().uri("/api/checkout").set_json(cart(manti, 1)).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  sqlx::query("UPDATE temp_orders SET expires_at = NOW() - INTERVAL '25 hours'")
    .execute(&pool)
    .await
    .unwrap();
  let report = reaper::sweep_once(&pool, Utc::now()).await.unwrap();
  assert_eq!(report.temp_orders, 1);
  assert_eq!(count(&pool, "temp_orders").await, 0);
}

async fn set_status(state: &lokanta::state::AppState, order_id: i64, status: OrderStatus) -> OrderStatusCtxData {
  let ctx_data = ContextData::new(OrderStatusCtxData {
    app_state: state.clone(),
    order_id,
    new_status: status,
    change: None,
    cancellation_email_sent: false,
  });
  let result = state.registry.run(ctx_data.clone()).await.unwrap();
  assert!(matches!(result, PipelineResult::Completed));
  ctx_data.snapshot(|c| c.clone())
}

#[sqlx::test(migrations = "./migrations")]
async fn cancellation_email_is_sent_only_on_entering_cancelled(pool: PgPool) {
  let corba = seed_menu_item(&pool, "Tarhana", 7_500, None).await;
  let order = seed_order(&pool, &[(corba, 1, 7_500)]).await;
  let test_app = test_app(pool.clone());

  let first = set_status(&test_app.state, order.id, OrderStatus::Cancelled).await;
  assert!(first.cancellation_email_sent);
  let again = set_status(&test_app.state, order.id, OrderStatus::Cancelled).await;
  assert!(!again.cancellation_email_sent);
  assert_eq!(again.change.unwrap().order.status, OrderStatus::Cancelled);

  let sent = test_app.mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "ayse@example.com");

  set_status(&test_app.state, order.id, OrderStatus::Pending).await;
  let reopened = set_status(&test_app.state, order.id, OrderStatus::Cancelled).await;
  assert!(reopened.cancellation_email_sent);
  assert_eq!(test_app.mailer.sent().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn emptying_categories_keeps_menu_and_order_history(pool: PgPool) {
  let grills = seed_category(&pool, "Izgaralar").await;
  let kofte = seed_menu_item(&pool, "Köfte", 20_000, Some(grills)).await;
  let sis = seed_menu_item(&pool, "Şiş", 24_000, Some(grills)).await;
  seed_order(&pool, &[(kofte, 1, 20_000), (sis, 1, 24_000)]).await;

  let removed = db::maintenance::empty_table(&pool, "categories").await.unwrap();
  assert_eq!(removed, 1);

  assert_eq!(count(&pool, "categories").await, 0);
  assert_eq!(count(&pool, "menu_items").await, 2);
  assert_eq!(count(&pool, "order_items").await, 2);
  assert_eq!(count(&pool, "orders").await, 1);
  let menu = db::catalog::list_menu(&pool).await.unwrap();
  assert!(menu.iter().all(|m| m.category_id.is_none()));
}

#[sqlx::test(migrations = "./migrations")]
async fn emptying_a_referenced_table_conflicts_and_removes_nothing(pool: PgPool) {
  let kofte = seed_menu_item(&pool, "Köfte", 20_000, None).await;
  seed_order(&pool, &[(kofte, 1, 20_000)]).await;

  let err = db::maintenance::empty_table(&pool, "menu_items").await.unwrap_err();
  assert!(matches!(err, AppError::Conflict { .. }));
  assert_eq!(count(&pool, "menu_items").await, 1);
  assert_eq!(count(&pool, "order_items").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_credential_changes_revoke_sessions(pool: PgPool) {
  let (admin, token) = seed_admin(&pool, "admin@lokanta.app", "eski-sifre").await;
  let app = app!(test_app(pool.clone()).state);

  let req = test::TestRequest::post()
    .uri("/api/admin/change-password")
    .insert_header(("Authorization", format!("Bearer {}", token)))
    .set_json(json!({ "currentPassword": "eski-sifre", "newPassword": "yeni-sifre" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["requireRelogin"], true);
  assert!(db::sessions::find(&pool, &token).await.unwrap().is_none());

  let token = lokanta::services::auth_service::generate_session_token();
  db::sessions::create(&pool, &token, admin.id, Utc::now() + chrono::Duration::hours(1))
    .await
    .unwrap();
  let req = test::TestRequest::post()
    .uri("/api/admin/change-email")
    .insert_header(("Authorization", format!("Bearer {}", token)))
    .set_json(json!({ "currentPassword": "yeni-sifre", "newEmail": "Patron@Lokanta.app" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(db::sessions::find(&pool, &token).await.unwrap().is_none());
  let updated = db::users::find_by_id(&pool, admin.id).await.unwrap().unwrap();
  assert_eq!(updated.email, "patron@lokanta.app");
}
