use color_eyre::Result;
use tracing::info;
use url::Url;

use super::Notification;

/// Capabilities the hosting environment exposes to the worker.
pub trait Host: Send + Sync {
  /// Take control of every open page in scope without a reload.
  fn claim_clients(&self) -> Result<()>;

  /// Open (or focus) a page at `url`.
  fn open_window(&self, url: &Url) -> Result<()>;

  fn show_notification(&self, notification: &Notification) -> Result<()>;

  fn close_notification(&self, notification: &Notification) -> Result<()>;
}

/// Host for command-line use: reports each action on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleHost;

impl Host for ConsoleHost {
  fn claim_clients(&self) -> Result<()> {
    info!("Claimed clients");
    Ok(())
  }

  fn open_window(&self, url: &Url) -> Result<()> {
    info!(%url, "Opening window");
    println!("open {}", url);
    Ok(())
  }

  fn show_notification(&self, notification: &Notification) -> Result<()> {
    info!(title = %notification.title, "Showing notification");
    println!("[{}] {}", notification.title, notification.body);
    for action in &notification.actions {
      println!("  ({}) {}", action.action, action.title);
    }
    Ok(())
  }

  fn close_notification(&self, notification: &Notification) -> Result<()> {
    info!(title = %notification.title, "Closing notification");
    Ok(())
  }
}
