//! Push display and notification click routing.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Host, ServiceWorker};
use crate::cache::CacheStore;
use crate::db::PendingStore;
use crate::http::Network;

pub const VIEW_ACTION: &str = "view";
pub const DISMISS_ACTION: &str = "dismiss";

/// A notification as handed to the host for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub data: serde_json::Value,
  pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
  pub icon: Option<String>,
}

/// Payload shape sent by the push service. Every field is optional.
///
/// `icon` and `badge` may also be sent but are ignored: the app's own asset
/// paths are always used.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
  title: Option<String>,
  body: Option<String>,
  data: Option<serde_json::Value>,
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Show a notification for a push message. Empty or malformed payloads are dropped.
  pub fn push(&self, data: Option<&[u8]>) {
    let Some(data) = data else {
      debug!("Push without payload");
      return;
    };

    let payload: PushPayload = match serde_json::from_slice(data) {
      Ok(payload) => payload,
      Err(e) => {
        debug!("Ignoring malformed push payload: {}", e);
        return;
      }
    };

    let notification = self.build_notification(payload);
    if let Err(e) = self.host.show_notification(&notification) {
      warn!("Failed to show notification: {:#}", e);
    }
  }

  /// Close the notification and, for the `view` action, open the app.
  pub fn notification_click(&self, notification: &Notification, action: Option<&str>) {
    if let Err(e) = self.host.close_notification(notification) {
      warn!("Failed to close notification: {:#}", e);
    }

    if action == Some(VIEW_ACTION) {
      let opened = self
        .scope
        .resolve("/")
        .and_then(|root| self.host.open_window(&root));
      if let Err(e) = opened {
        warn!("Failed to open window: {:#}", e);
      }
    }
  }

  fn build_notification(&self, payload: PushPayload) -> Notification {
    let defaults = &self.notifications;
    Notification {
      title: payload.title.unwrap_or_else(|| defaults.title.clone()),
      body: payload.body.unwrap_or_else(|| defaults.body.clone()),
      icon: defaults.icon.clone(),
      badge: defaults.badge.clone(),
      data: payload
        .data
        .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
      actions: vec![
        NotificationAction {
          action: VIEW_ACTION.to_string(),
          title: "View".to_string(),
          icon: Some(defaults.badge.clone()),
        },
        NotificationAction {
          action: DISMISS_ACTION.to_string(),
          title: "Dismiss".to_string(),
          icon: None,
        },
      ],
    }
  }

  /// Notification built from defaults only, e.g. for simulating a click.
  pub fn default_notification(&self) -> Notification {
    self.build_notification(PushPayload::default())
  }
}

#[cfg(test)]
mod tests {
  use crate::config::Config;
  use crate::event::WorkerEvent;
  use crate::worker::testing::{fixture, fixture_with, ORIGIN};

  #[tokio::test]
  async fn test_push_without_data_shows_nothing() {
    let fx = fixture();
    fx.worker.handle(WorkerEvent::Push { data: None }).await;
    assert!(fx.host.shown().is_empty());
  }

  #[tokio::test]
  async fn test_push_with_malformed_data_shows_nothing() {
    let fx = fixture();
    fx.worker
      .handle(WorkerEvent::Push {
        data: Some(b"not json".to_vec()),
      })
      .await;
    assert!(fx.host.shown().is_empty());
  }

  #[tokio::test]
  async fn test_push_defaults() {
    let fx = fixture();
    fx.worker
      .handle(WorkerEvent::Push {
        data: Some(b"{}".to_vec()),
      })
      .await;

    let shown = fx.host.shown();
    assert_eq!(shown.len(), 1);
    let notification = &shown[0];
    assert_eq!(notification.title, "AttenDANCE");
    assert_eq!(notification.body, "New notification from AttenDANCE");
    assert_eq!(notification.icon, "/static/icons/icon-192x192.png");
    assert_eq!(notification.badge, "/static/icons/icon-96x96.png");
    assert_eq!(notification.data, serde_json::json!({}));

    let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, vec!["view", "dismiss"]);
  }

  #[tokio::test]
  async fn test_push_payload_sets_title_body_and_data() {
    let fx = fixture();
    let payload = serde_json::json!({
      "title": "Class cancelled",
      "body": "Salsa 101 is cancelled tonight",
      "data": {"class_id": 4},
      "icon": "https://tracker.example/pixel.png",
      "badge": "/elsewhere.png",
    });
    fx.worker
      .handle(WorkerEvent::Push {
        data: Some(payload.to_string().into_bytes()),
      })
      .await;

    let shown = fx.host.shown();
    assert_eq!(shown[0].title, "Class cancelled");
    assert_eq!(shown[0].body, "Salsa 101 is cancelled tonight");
    assert_eq!(shown[0].data["class_id"], 4);
    assert_eq!(shown[0].icon, "/static/icons/icon-192x192.png");
    assert_eq!(shown[0].badge, "/static/icons/icon-96x96.png");
  }

  #[tokio::test]
  async fn test_view_click_closes_and_opens_root() {
    let fx = fixture();
    let notification = fx.worker.default_notification();

    fx.worker
      .handle(WorkerEvent::NotificationClick {
        notification,
        action: Some("view".to_string()),
      })
      .await;

    assert_eq!(fx.host.closed(), 1);
    assert_eq!(fx.host.opened(), vec![format!("{}/", ORIGIN)]);
  }

  #[tokio::test]
  async fn test_view_click_opens_root_when_origin_has_a_path() {
    let fx = fixture_with(Config {
      origin: format!("{}/app/", ORIGIN),
      ..Config::default()
    });

    fx.worker
      .handle(WorkerEvent::NotificationClick {
        notification: fx.worker.default_notification(),
        action: Some("view".to_string()),
      })
      .await;

    assert_eq!(fx.host.opened(), vec![format!("{}/", ORIGIN)]);
  }

  #[tokio::test]
  async fn test_other_clicks_only_close() {
    let fx = fixture();
    for action in [Some("dismiss".to_string()), None] {
      fx.worker
        .handle(WorkerEvent::NotificationClick {
          notification: fx.worker.default_notification(),
          action,
        })
        .await;
    }

    assert_eq!(fx.host.closed(), 2);
    assert!(fx.host.opened().is_empty());
  }
}
