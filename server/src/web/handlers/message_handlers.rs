// server/src/web/handlers/message_handlers.rs

//! Forum and direct messages. Polling endpoints are authoritative; the
//! event stream pushes new messages as they are written.

use actix_web::{http::header, web, HttpResponse};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::db;
use crate::errors::AppError;
use crate::services::message_hub::HubEvent;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::parse;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostPayload {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub image_path: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DirectPostPayload {
  #[serde(default)]
  pub receiver_id: Value,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub image_path: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThreadQuery {
  pub receiver_id: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Text and image path after trimming; at least one must be present.
fn message_content(message: Option<String>, image_path: Option<String>) -> Result<(Option<String>, Option<String>), AppError> {
  let message = non_blank(message);
  let image_path = non_blank(image_path);
  if message.is_none() && image_path.is_none() {
    return Err(AppError::Validation("A message or an image is required.".to_string()));
  }
  Ok((message, image_path))
}

fn receiver_id(raw: &Value) -> Result<i64, AppError> {
  parse::integer(raw, "receiverId")?
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation("receiverId is required.".to_string()))
}

// --- Forum ---

pub async fn forum_messages_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let messages = db::messages::recent_forum(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "messages": messages })))
}

#[instrument(name = "handler::post_forum_message", skip_all, fields(user_id = auth_user.0.id))]
pub async fn post_forum_message_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ForumPostPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let (message, image_path) = message_content(payload.message, payload.image_path)?;
  let created = db::messages::insert_forum(&app_state.db_pool, auth_user.0.id, message.as_deref(), image_path.as_deref()).await?;
  let delivered = app_state.hub.publish(HubEvent::Forum(created.clone()));
  info!(message_id = created.id, delivered, "Forum message posted.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Message sent.",
    "id": created.id,
    "newMessage": created,
  })))
}

// --- Direct ---

#[instrument(name = "handler::direct_thread", skip_all, fields(user_id = auth_user.0.id))]
pub async fn direct_messages_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ThreadQuery>,
) -> Result<HttpResponse, AppError> {
  let other_id = receiver_id(&query.receiver_id.clone().map(Value::String).unwrap_or(Value::Null))?;
  let messages = db::messages::read_thread(&app_state.db_pool, auth_user.0.id, other_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "messages": messages })))
}

#[instrument(name = "handler::post_direct_message", skip_all, fields(user_id = auth_user.0.id))]
pub async fn post_direct_message_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<DirectPostPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let sender_id = auth_user.0.id;
  let to = receiver_id(&payload.receiver_id)?;
  let (message, image_path) = message_content(payload.message, payload.image_path)?;
  if to == sender_id {
    return Err(AppError::Validation("You cannot send a message to yourself.".to_string()));
  }
  if db::users::find_by_id(&app_state.db_pool, to).await?.is_none() {
    return Err(AppError::NotFound("Receiver not found.".to_string()));
  }

  let created = db::messages::insert_direct(&app_state.db_pool, sender_id, to, message.as_deref(), image_path.as_deref()).await?;
  let delivered = app_state.hub.publish(HubEvent::Direct(created.clone()));
  info!(message_id = created.id, receiver_id = to, delivered, "Direct message sent.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Message sent.",
    "id": created.id,
    "newMessage": created,
  })))
}

pub async fn unread_counts_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let counts = db::messages::unread_counts(&app_state.db_pool, auth_user.0.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "unreadCounts": counts })))
}

// --- Push ---

/// One server-sent event frame carrying `event` as JSON.
pub fn sse_frame(event: &HubEvent) -> Option<web::Bytes> {
  serde_json::to_string(event)
    .ok()
    .map(|payload| web::Bytes::from(format!("data: {}\n\n", payload)))
}

/// Server-sent events with every new message visible to the caller.
#[instrument(name = "handler::message_stream", skip_all, fields(user_id = auth_user.0.id))]
pub async fn message_stream_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> HttpResponse {
  let user_id = auth_user.0.id;
  let events = app_state
    .hub
    .subscribe(user_id)
    .filter_map(|event| async move { sse_frame(&event) });
  debug!(subscribers = app_state.hub.subscriber_count(), "Message stream opened.");

  let opening = stream::once(async { web::Bytes::from_static(b": connected\n\n") });
  let body = opening.chain(events).map(Ok::<_, actix_web::Error>);

  HttpResponse::Ok()
    .content_type("text/event-stream")
    .insert_header((header::CACHE_CONTROL, "no-cache"))
    .streaming(body)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::message::ForumMessage;
  use chrono::Utc;

  #[test]
  fn content_requires_text_or_image() {
    assert!(message_content(Some("  ".into()), None).is_err());
    assert_eq!(
      message_content(None, Some("/uploads/2024-06/a.png".into())).unwrap(),
      (None, Some("/uploads/2024-06/a.png".to_string()))
    );
    assert_eq!(message_content(Some(" merhaba ".into()), None).unwrap().0.as_deref(), Some("merhaba"));
  }

  #[test]
  fn receiver_id_accepts_numbers_and_strings() {
    assert_eq!(receiver_id(&json!(5)).unwrap(), 5);
    assert_eq!(receiver_id(&json!("12")).unwrap(), 12);
    assert!(receiver_id(&Value::Null).is_err());
    assert!(receiver_id(&json!("abc")).is_err());
  }

  #[test]
  fn sse_frames_are_data_lines() {
    let event = HubEvent::Forum(ForumMessage {
      id: 9,
      author_id: 2,
      message: Some("Afiyet olsun".into()),
      image_path: None,
      created_at: Utc::now(),
      author_first_name: "Ayşe".into(),
      author_last_name: "Yılmaz".into(),
      author_email: "ayse@example.com".into(),
    });
    let frame = sse_frame(&event).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.starts_with("data: {"));
    assert!(text.ends_with("\n\n"));
    assert!(text.contains("\"type\":\"forum\""));
  }
}
