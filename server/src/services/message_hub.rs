// server/src/services/message_hub.rs

//! In-process publish/subscribe for new messages.
//!
//! Delivery is at-least-once from the moment of subscription. A subscriber
//! that falls behind skips the overflowed events and keeps going; clients
//! reconcile through the polling endpoints and deduplicate by message id.

use crate::models::message::{DirectMessage, ForumMessage};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum HubEvent {
  Forum(ForumMessage),
  Direct(DirectMessage),
}

impl HubEvent {
  pub fn visible_to(&self, user_id: i64) -> bool {
    match self {
      HubEvent::Forum(_) => true,
      HubEvent::Direct(dm) => dm.sender_id == user_id || dm.receiver_id == user_id,
    }
  }
}

#[derive(Clone)]
pub struct MessageHub {
  sender: broadcast::Sender<HubEvent>,
}

impl MessageHub {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Self { sender }
  }

  /// Returns how many subscribers received the event.
  pub fn publish(&self, event: HubEvent) -> usize {
    // No subscribers is not an error.
    self.sender.send(event).unwrap_or(0)
  }

  pub fn subscriber_count(&self) -> usize {
    self.sender.receiver_count()
  }

  /// Events visible to `user_id`, published after this call.
  pub fn subscribe(&self, user_id: i64) -> impl Stream<Item = HubEvent> + Send + 'static {
    let receiver = self.sender.subscribe();
    stream::unfold(receiver, move |mut receiver| async move {
      loop {
        match receiver.recv().await {
          Ok(event) if event.visible_to(user_id) => return Some((event, receiver)),
          Ok(_) => continue,
          Err(RecvError::Lagged(skipped)) => {
            warn!(user_id, skipped, "Message stream subscriber lagged; events skipped.");
            continue;
          }
          Err(RecvError::Closed) => {
            debug!(user_id, "Message hub closed.");
            return None;
          }
        }
      }
    })
  }
}

impl Default for MessageHub {
  fn default() -> Self {
    Self::new(256)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use futures_util::StreamExt;
  use std::time::Duration;

  fn direct(id: i64, sender_id: i64, receiver_id: i64) -> HubEvent {
    HubEvent::Direct(DirectMessage {
      id,
      sender_id,
      receiver_id,
      message: Some("merhaba".into()),
      image_path: None,
      is_read: false,
      created_at: Utc::now(),
      sender_first_name: "Ali".into(),
      sender_last_name: "Kaya".into(),
    })
  }

  fn forum(id: i64) -> HubEvent {
    HubEvent::Forum(ForumMessage {
      id,
      author_id: 1,
      message: Some("herkese selam".into()),
      image_path: None,
      created_at: Utc::now(),
      author_first_name: "Ali".into(),
      author_last_name: "Kaya".into(),
      author_email: "ali@example.com".into(),
    })
  }

  fn event_id(event: &HubEvent) -> i64 {
    match event {
      HubEvent::Forum(m) => m.id,
      HubEvent::Direct(m) => m.id,
    }
  }

  #[tokio::test]
  async fn direct_messages_reach_only_participants() {
    let hub = MessageHub::new(16);
    let stream = hub.subscribe(3);
    tokio::pin!(stream);

    hub.publish(direct(1, 1, 2));
    hub.publish(direct(2, 1, 3));
    hub.publish(forum(3));

    let first = stream.next().await.unwrap();
    let second = stream.next().await.unwrap();
    assert_eq!(event_id(&first), 2);
    assert_eq!(event_id(&second), 3);
  }

  #[tokio::test]
  async fn publishing_without_subscribers_is_fine() {
    let hub = MessageHub::default();
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(hub.publish(forum(1)), 0);
  }

  #[tokio::test]
  async fn lagging_subscriber_skips_and_continues() {
    let hub = MessageHub::new(2);
    let stream = hub.subscribe(9);
    tokio::pin!(stream);

    for id in 1..=5 {
      hub.publish(forum(id));
    }
    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
      .await
      .unwrap()
      .unwrap();
    assert!(event_id(&next) >= 4);
  }

  #[test]
  fn events_serialize_with_type_tag() {
    let json = serde_json::to_value(forum(5)).unwrap();
    assert_eq!(json["type"], "forum");
    assert_eq!(json["message"]["id"], 5);
  }
}
