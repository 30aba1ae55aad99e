//! Command-line surface: one subcommand per worker event plus queue and cache inspection.

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Install the current cache version and activate it
  Install,
  /// Activate the current cache version and remove older ones
  Activate,
  /// Resolve a request through the worker
  Fetch {
    /// Absolute URL or a path relative to the origin
    url: String,
    /// Treat the request as a page navigation
    #[arg(long)]
    navigate: bool,
    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
  },
  /// Fire a background sync event
  Sync {
    #[arg(long, default_value = "attendance-sync")]
    tag: String,
  },
  /// Deliver a push message (JSON payload; omit for an empty push)
  Push { payload: Option<String> },
  /// Click the default notification
  Click {
    /// Notification action, e.g. "view" or "dismiss"
    #[arg(long)]
    action: Option<String>,
  },
  /// Post a JSON message from a page, e.g. '{"type":"SKIP_WAITING"}'
  Message { json: String },
  /// Queue a check-in for the next background sync
  Enqueue {
    student_id: i64,
    class_id: i64,
    #[arg(long)]
    notes: Option<String>,
  },
  /// List queued check-ins
  Pending,
  /// List cache versions and the entries of the current one
  Caches,
}
