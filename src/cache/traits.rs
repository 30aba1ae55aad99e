//! Core traits and types for cache generations.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use sha2::{Digest, Sha256};

use crate::http::{Request, Response};

/// Normalized identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
  pub method: String,
  /// Absolute URL without fragment
  pub url: String,
}

impl CacheKey {
  pub fn for_request(request: &Request) -> Self {
    let mut url = request.url.clone();
    url.set_fragment(None);
    Self {
      method: request.method.as_str().to_uppercase(),
      url: url.to_string(),
    }
  }

  /// SHA256 hash for stable, fixed-length storage keys.
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// A response snapshot as it lives in a cache generation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
  pub status: u16,
  pub status_text: String,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub cached_at: DateTime<Utc>,
}

impl StoredResponse {
  /// Snapshot a response, consuming its body.
  pub fn capture(mut response: Response) -> Result<Self> {
    let body = response.take_body()?;
    Ok(Self {
      status: response.status,
      status_text: response.status_text,
      headers: response.headers,
      body,
      cached_at: Utc::now(),
    })
  }

  pub fn into_response(self) -> Response {
    Response::from_parts(self.status, self.status_text, self.headers, self.body)
  }
}

/// Backend holding every cache generation.
///
/// Generations are namespaces of request → response pairs. Entries are only
/// ever inserted or overwritten; removal happens a whole generation at a time.
pub trait CacheStore: Send + Sync {
  /// Create the generation if it does not exist yet.
  fn open(&self, generation: &str) -> Result<()>;

  /// Names of all existing generations.
  fn generations(&self) -> Result<Vec<String>>;

  /// Delete a generation and all of its entries. Returns false if it did not exist.
  fn delete_generation(&self, generation: &str) -> Result<bool>;

  /// Exact-key lookup within one generation.
  fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<StoredResponse>>;

  /// Write entries atomically: either all of them land or none do.
  fn store(&self, generation: &str, entries: &[(CacheKey, StoredResponse)]) -> Result<()>;

  /// Keys of all entries in a generation, ordered by URL.
  fn keys(&self, generation: &str) -> Result<Vec<CacheKey>>;
}

/// Indicates where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Cache hit before touching the network
  Cache,
  /// Fresh data from network
  Network,
  /// Offline mode - network failed, serving a cached fallback
  OfflineCache,
  /// Offline mode - nothing cached, synthesized placeholder
  Placeholder,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::Cache => "cache",
      Self::Network => "network",
      Self::OfflineCache => "offline-cache",
      Self::Placeholder => "placeholder",
    };
    f.write_str(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn test_key_ignores_fragment() {
    let a = Request::get(Url::parse("http://localhost:5000/students#top").unwrap());
    let b = Request::get(Url::parse("http://localhost:5000/students").unwrap());
    assert_eq!(CacheKey::for_request(&a), CacheKey::for_request(&b));
    assert_eq!(CacheKey::for_request(&a).hash(), CacheKey::for_request(&b).hash());
  }

  #[test]
  fn test_key_distinguishes_query_and_method() {
    let plain = Request::get(Url::parse("http://localhost:5000/api/classes").unwrap());
    let query = Request::get(Url::parse("http://localhost:5000/api/classes?page=2").unwrap());
    let head = plain.clone().with_method(reqwest::Method::HEAD);

    assert_ne!(CacheKey::for_request(&plain).hash(), CacheKey::for_request(&query).hash());
    assert_ne!(CacheKey::for_request(&plain).hash(), CacheKey::for_request(&head).hash());
  }

  #[test]
  fn test_capture_round_trips_response() {
    let response = Response::new(200, "<h1>hi</h1>").with_header("Content-Type", "text/html");
    let stored = StoredResponse::capture(response).unwrap();
    let restored = stored.clone().into_response();

    assert_eq!(restored.status, 200);
    assert_eq!(restored.header("content-type"), Some("text/html"));
    assert_eq!(restored.text().unwrap(), "<h1>hi</h1>");
  }
}
