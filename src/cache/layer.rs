//! Handle onto the current cache generation.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::{CacheKey, CacheStore, StoredResponse};
use crate::http::{Request, Response};

/// Cache layer that scopes every read and write to one named generation.
///
/// All other generations are considered stale; [`CacheLayer::purge_stale`]
/// removes them.
pub struct CacheLayer<S: CacheStore> {
  storage: Arc<S>,
  generation: String,
}

impl<S: CacheStore> CacheLayer<S> {
  /// Create a new cache layer for `generation` on the given storage backend.
  pub fn new(storage: S, generation: impl Into<String>) -> Self {
    Self {
      storage: Arc::new(storage),
      generation: generation.into(),
    }
  }

  /// Name of the current generation.
  pub fn generation(&self) -> &str {
    &self.generation
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Create the current generation if needed.
  pub fn open(&self) -> Result<()> {
    self.storage.open(&self.generation)
  }

  /// Exact match for `request` in the current generation.
  pub fn match_request(&self, request: &Request) -> Result<Option<Response>> {
    let key = CacheKey::for_request(request);
    let hit = self.storage.lookup(&self.generation, &key)?;
    Ok(hit.map(StoredResponse::into_response))
  }

  /// Store one response under `request`, consuming the response.
  pub fn put(&self, request: &Request, response: Response) -> Result<()> {
    let entry = (CacheKey::for_request(request), StoredResponse::capture(response)?);
    self.storage.store(&self.generation, &[entry])
  }

  /// Store several responses in one atomic write.
  pub fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<()> {
    let entries = entries
      .into_iter()
      .map(|(request, response)| {
        Ok((CacheKey::for_request(&request), StoredResponse::capture(response)?))
      })
      .collect::<Result<Vec<_>>>()?;

    self.storage.store(&self.generation, &entries)
  }

  /// Keys currently held by the current generation.
  pub fn keys(&self) -> Result<Vec<CacheKey>> {
    self.storage.keys(&self.generation)
  }

  /// Delete every generation whose name differs from the current one.
  ///
  /// Returns the names that were removed.
  pub fn purge_stale(&self) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for name in self.storage.generations()? {
      if name == self.generation {
        continue;
      }
      info!(cache = %name, "Deleting old cache");
      if self.storage.delete_generation(&name)? {
        removed.push(name);
      } else {
        debug!(cache = %name, "Cache already gone");
      }
    }
    Ok(removed)
  }
}
