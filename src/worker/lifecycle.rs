//! Install / activate handling and the worker state machine.

use color_eyre::{eyre::eyre, Result};
use tracing::{error, info, warn};

use super::{Host, ServiceWorker};
use crate::cache::CacheStore;
use crate::db::PendingStore;
use crate::http::Network;

/// Lifecycle states of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
}

/// Current state plus the skip-waiting request.
#[derive(Debug)]
pub struct Lifecycle {
  state: WorkerState,
  skip_waiting: bool,
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: WorkerState::Parsed,
      skip_waiting: false,
    }
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  /// Move to `next`, rejecting transitions the lifecycle does not allow.
  ///
  /// Activation is accepted straight from `Parsed`: a worker process may be
  /// started after an earlier process already installed this version.
  pub fn transition(&mut self, next: WorkerState) -> Result<()> {
    use WorkerState::*;

    let allowed = matches!(
      (self.state, next),
      (Parsed, Installing)
        | (Installing, Installed)
        | (Parsed | Installed, Activating)
        | (Activating, Activated)
    );
    if !allowed {
      return Err(eyre!(
        "Invalid worker transition {:?} -> {:?}",
        self.state,
        next
      ));
    }

    self.state = next;
    Ok(())
  }

  /// Skip the waiting phase once installed.
  pub fn skip_waiting(&mut self) {
    self.skip_waiting = true;
  }

  /// True when the host should deliver `activate` without waiting for old clients.
  pub fn ready_to_activate(&self) -> bool {
    self.state == WorkerState::Installed && self.skip_waiting
  }
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Open the current generation and preload the static URL set.
  ///
  /// A failed preload is logged and leaves the generation empty; installation
  /// still completes and waiting is skipped.
  pub async fn install(&self) {
    if let Err(e) = self.lifecycle().transition(WorkerState::Installing) {
      warn!("Ignoring install: {}", e);
      return;
    }
    info!(cache = %self.cache.generation(), "Installing");

    if let Err(e) = self.preload().await {
      error!("Error caching static resources: {:#}", e);
    }

    let mut lifecycle = self.lifecycle();
    if let Err(e) = lifecycle.transition(WorkerState::Installed) {
      warn!("{}", e);
    }
    lifecycle.skip_waiting();
  }

  async fn preload(&self) -> Result<usize> {
    self.cache.open()?;
    info!(count = self.precache.len(), "Caching static resources");
    self.add_all(&self.precache).await
  }

  /// Delete every stale generation and take control of open pages.
  pub fn activate(&self) {
    if let Err(e) = self.lifecycle().transition(WorkerState::Activating) {
      warn!("Ignoring activate: {}", e);
      return;
    }
    info!(cache = %self.cache.generation(), "Activating");

    match self.cache.purge_stale() {
      Ok(removed) if !removed.is_empty() => info!(count = removed.len(), "Removed old caches"),
      Ok(_) => {}
      Err(e) => error!("Failed to clean up old caches: {:#}", e),
    }

    if let Err(e) = self.host.claim_clients() {
      warn!("Failed to claim clients: {:#}", e);
    }

    if let Err(e) = self.lifecycle().transition(WorkerState::Activated) {
      warn!("{}", e);
    }
  }
}
