use crate::cache::CacheSource;
use crate::http::{Request, Response};
use crate::worker::Notification;

/// Events the host delivers to the worker, one at a time.
#[derive(Debug)]
pub enum WorkerEvent {
  /// A new worker version was registered
  Install,
  /// The worker became the active controller
  Activate,
  /// A page issued a request inside the worker's scope
  Fetch(Request),
  /// Background sync fired for `tag`
  Sync { tag: String },
  /// Push message, with the raw payload if one was attached
  Push { data: Option<Vec<u8>> },
  /// The user clicked a displayed notification (or one of its actions)
  NotificationClick {
    notification: Notification,
    action: Option<String>,
  },
  /// `postMessage` from a controlled page
  Message(serde_json::Value),
}

impl WorkerEvent {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Install => "install",
      Self::Activate => "activate",
      Self::Fetch(_) => "fetch",
      Self::Sync { .. } => "sync",
      Self::Push { .. } => "push",
      Self::NotificationClick { .. } => "notificationclick",
      Self::Message(_) => "message",
    }
  }
}

/// Result of resolving an intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
  /// Not intercepted; the host performs its default network handling
  Passthrough,
  /// The worker answered the request
  Respond {
    response: Response,
    source: CacheSource,
  },
}

/// What the host gets back once an event's work has settled.
#[derive(Debug)]
pub enum EventOutcome {
  Completed,
  Fetch(FetchOutcome),
}
