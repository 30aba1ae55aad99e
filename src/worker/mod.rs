//! The interception worker.
//!
//! One reactive handler set keyed by event type. The host delivers events one
//! at a time through [`ServiceWorker::handle`] and awaits the returned future;
//! that await is what keeps the worker alive until the event's work settles.
//!
//! No handler ever fails the worker: install, sync, push and message errors are
//! logged and swallowed, and fetch always produces a response or a
//! pass-through.

mod fetch;
mod host;
mod lifecycle;
mod message;
mod notify;
mod sync;

#[cfg(test)]
mod testing;

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use url::Url;

use crate::cache::{CacheLayer, CacheStore};
use crate::config::{Config, NotificationConfig};
use crate::db::PendingStore;
use crate::event::{EventOutcome, WorkerEvent};
use crate::http::{Network, Request};

pub use fetch::Scope;
pub use host::{ConsoleHost, Host};
pub use lifecycle::{Lifecycle, WorkerState};
pub use notify::Notification;

/// Interception worker bound to one cache generation.
pub struct ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  scope: Scope,
  cache: CacheLayer<S>,
  network: N,
  pending: P,
  host: H,
  /// Static URL set cached on install
  precache: Vec<Url>,
  offline_page: Url,
  sync_tag: String,
  sync_endpoint: Url,
  notifications: NotificationConfig,
  lifecycle: Mutex<Lifecycle>,
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Build a worker from configuration and its backends.
  pub fn new(config: &Config, storage: S, network: N, pending: P, host: H) -> Result<Self> {
    let scope = Scope::from_config(config)?;

    let precache = config
      .precache
      .iter()
      .map(|u| scope.resolve(u))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      offline_page: scope.resolve(&config.offline_page)?,
      sync_endpoint: scope.resolve(&config.sync.endpoint)?,
      sync_tag: config.sync.tag.clone(),
      notifications: config.notifications.clone(),
      cache: CacheLayer::new(storage, config.cache_name.clone()),
      scope,
      network,
      pending,
      host,
      precache,
      lifecycle: Mutex::new(Lifecycle::new()),
    })
  }

  /// Dispatch one event and run it to completion.
  pub async fn handle(&self, event: WorkerEvent) -> EventOutcome {
    debug!(event = event.kind(), "Dispatching event");

    match event {
      WorkerEvent::Install => self.install().await,
      WorkerEvent::Activate => self.activate(),
      WorkerEvent::Fetch(request) => return EventOutcome::Fetch(self.handle_fetch(request).await),
      WorkerEvent::Sync { tag } => {
        self.sync(&tag).await;
      }
      WorkerEvent::Push { data } => self.push(data.as_deref()),
      WorkerEvent::NotificationClick {
        notification,
        action,
      } => self.notification_click(&notification, action.as_deref()),
      WorkerEvent::Message(data) => self.message(data).await,
    }

    EventOutcome::Completed
  }

  pub fn cache(&self) -> &CacheLayer<S> {
    &self.cache
  }

  pub fn network(&self) -> &N {
    &self.network
  }

  pub fn pending(&self) -> &P {
    &self.pending
  }

  pub fn scope(&self) -> &Scope {
    &self.scope
  }

  pub fn state(&self) -> WorkerState {
    self.lifecycle().state()
  }

  /// Skip the waiting phase so activation follows install immediately.
  pub fn skip_waiting(&self) {
    self.lifecycle().skip_waiting();
  }

  pub fn ready_to_activate(&self) -> bool {
    self.lifecycle().ready_to_activate()
  }

  fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
    self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Fetch every URL and store all responses in the current generation.
  ///
  /// All-or-nothing: any transport error or non-2xx status aborts the whole
  /// batch before anything is written.
  async fn add_all(&self, urls: &[Url]) -> Result<usize> {
    let requests: Vec<Request> = urls.iter().cloned().map(Request::get).collect();

    let responses = try_join_all(requests.iter().map(|r| self.network.fetch(r))).await?;

    for (request, response) in requests.iter().zip(&responses) {
      if !response.ok() {
        return Err(eyre!(
          "Request for {} returned status {}",
          request.url,
          response.status
        ));
      }
    }

    let count = requests.len();
    self.cache.put_all(requests.into_iter().zip(responses).collect())?;
    Ok(count)
  }
}
