use color_eyre::Result;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{Host, ServiceWorker};
use crate::cache::CacheStore;
use crate::db::PendingStore;
use crate::http::Network;

/// Commands a controlled page can post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
  #[serde(rename = "SKIP_WAITING")]
  SkipWaiting,
  #[serde(rename = "CACHE_URLS")]
  CacheUrls { urls: Vec<String> },
}

impl PageMessage {
  /// Recognize a message, or `None` for any other shape.
  pub fn parse(data: &serde_json::Value) -> Option<Self> {
    PageMessage::deserialize(data).ok()
  }
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Handle a message from a page. Unrecognized messages are ignored.
  pub async fn message(&self, data: serde_json::Value) {
    debug!(%data, "Received message");

    match PageMessage::parse(&data) {
      Some(PageMessage::SkipWaiting) => self.skip_waiting(),
      Some(PageMessage::CacheUrls { urls }) => {
        if let Err(e) = self.cache_urls(&urls).await {
          error!("Failed to cache requested URLs: {:#}", e);
        }
      }
      None => debug!("Ignoring unrecognized message"),
    }
  }

  /// Add the given URLs to the current generation as one batch.
  async fn cache_urls(&self, urls: &[String]) -> Result<()> {
    let urls = urls
      .iter()
      .map(|u| self.scope.resolve(u))
      .collect::<Result<Vec<_>>>()?;

    self.cache.open()?;
    let count = self.add_all(&urls).await?;
    info!(count, "Cached requested URLs");
    Ok(())
  }
}
