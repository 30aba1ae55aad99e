//! Fetch interception and the offline response policy.
//!
//! Decision order for every intercepted request:
//! 1. Non-GET requests pass through
//! 2. Requests that are neither same-origin nor to an allow-listed CDN pass through
//! 3. Exact cache hit in the current generation is served immediately
//! 4. API calls go to the network; failures fall back to cache, then a 503 JSON body
//! 5. Everything else goes to the network; failures fall back to the offline
//!    page for navigations and a 503 text body otherwise
//!
//! Only responses with status exactly 200 are written to the cache.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use tracing::{debug, warn};
use url::Url;

use super::{Host, ServiceWorker};
use crate::cache::{CacheSource, CacheStore};
use crate::config::Config;
use crate::db::PendingStore;
use crate::event::FetchOutcome;
use crate::http::{Network, Request, Response};

const OFFLINE_PAGE_BODY: &str = "Offline - AttenDANCE";
const API_ERROR: &str = "Network unavailable";
const API_ERROR_MESSAGE: &str = "Please check your internet connection";

/// Which URLs the worker is allowed to intercept.
#[derive(Debug, Clone)]
pub struct Scope {
  origin: Url,
  cdn_hosts: Vec<String>,
  api_marker: String,
}

impl Scope {
  pub fn new(origin: Url, cdn_hosts: Vec<String>, api_marker: impl Into<String>) -> Self {
    Self {
      origin,
      cdn_hosts,
      api_marker: api_marker.into(),
    }
  }

  pub fn from_config(config: &Config) -> Result<Self> {
    Ok(Self::new(
      config.origin_url()?,
      config.cdn_hosts.clone(),
      config.api_marker.clone(),
    ))
  }

  /// Resolve a path (or absolute URL) against the origin.
  pub fn resolve(&self, url: &str) -> Result<Url> {
    self
      .origin
      .join(url)
      .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))
  }

  pub fn is_same_origin(&self, url: &Url) -> bool {
    url.origin() == self.origin.origin()
  }

  /// Host matches one of the allow-listed CDN names.
  pub fn is_cdn_request(&self, url: &Url) -> bool {
    url
      .host_str()
      .is_some_and(|host| self.cdn_hosts.iter().any(|cdn| host.contains(cdn.as_str())))
  }

  /// Path carries the API marker (`/api/`).
  pub fn is_api_request(&self, url: &Url) -> bool {
    url.path().contains(self.api_marker.as_str())
  }

  /// Method and origin filter applied before any cache or network work.
  pub fn intercepts(&self, request: &Request) -> bool {
    request.method == Method::GET
      && (self.is_same_origin(&request.url) || self.is_cdn_request(&request.url))
  }
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Resolve an intercepted request.
  pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
    if !self.scope.intercepts(&request) {
      debug!(method = %request.method, url = %request.url, "Passing through");
      return FetchOutcome::Passthrough;
    }

    if let Some(cached) = self.cached(&request) {
      debug!(url = %request.url, "Serving from cache");
      return FetchOutcome::Respond {
        response: cached,
        source: CacheSource::Cache,
      };
    }

    let (response, source) = if self.scope.is_api_request(&request.url) {
      self.fetch_and_cache(&request).await
    } else {
      self.fetch_with_fallback(&request).await
    };

    FetchOutcome::Respond { response, source }
  }

  /// Network first for API calls, falling back to any cached copy.
  async fn fetch_and_cache(&self, request: &Request) -> (Response, CacheSource) {
    match self.network.fetch(request).await {
      Ok(response) => {
        self.cache_if_ok(request, &response);
        (response, CacheSource::Network)
      }
      Err(e) => {
        warn!(url = %request.url, "Network request failed, serving from cache: {:#}", e);
        match self.cached(request) {
          Some(cached) => (cached, CacheSource::OfflineCache),
          None => (api_unavailable(), CacheSource::Placeholder),
        }
      }
    }
  }

  /// Network with offline fallbacks for pages and assets.
  async fn fetch_with_fallback(&self, request: &Request) -> (Response, CacheSource) {
    match self.network.fetch(request).await {
      Ok(response) => {
        self.cache_if_ok(request, &response);
        (response, CacheSource::Network)
      }
      Err(e) => {
        warn!(url = %request.url, "Network request failed: {:#}", e);
        if request.is_navigation() {
          self.offline_navigation()
        } else {
          (offline_text(), CacheSource::Placeholder)
        }
      }
    }
  }

  /// Cached offline page, else cached root document, else a synthesized page.
  fn offline_navigation(&self) -> (Response, CacheSource) {
    std::iter::once(self.offline_page.clone())
      .chain(self.scope.resolve("/").ok())
      .find_map(|url| self.cached(&Request::get(url)))
      .map(|response| (response, CacheSource::OfflineCache))
      .unwrap_or_else(|| (offline_page(), CacheSource::Placeholder))
  }

  /// Cache lookup where a storage error counts as a miss.
  fn cached(&self, request: &Request) -> Option<Response> {
    self.cache.match_request(request).unwrap_or_else(|e| {
      warn!(url = %request.url, "Cache lookup failed: {:#}", e);
      None
    })
  }

  /// Store a copy of a 200 response; the caller keeps the original.
  fn cache_if_ok(&self, request: &Request, response: &Response) {
    if response.status != 200 {
      return;
    }
    let stored = response
      .try_clone()
      .and_then(|copy| self.cache.put(request, copy));
    if let Err(e) = stored {
      warn!(url = %request.url, "Failed to cache response: {:#}", e);
    }
  }
}

fn offline_page() -> Response {
  Response::new(200, OFFLINE_PAGE_BODY).with_header("Content-Type", "text/html")
}

fn offline_text() -> Response {
  Response::new(503, "Offline")
    .with_status_text("Service Unavailable")
    .with_header("Content-Type", "text/plain")
}

fn api_unavailable() -> Response {
  let body = serde_json::json!({
    "error": API_ERROR,
    "message": API_ERROR_MESSAGE,
  });
  Response::new(503, body.to_string()).with_header("Content-Type", "application/json")
}
