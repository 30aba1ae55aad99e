//! Owned request and response values passed between the worker, the cache and the network.
//!
//! A [`Response`] body can be read exactly once. Anything that needs the same
//! response twice (hand it to the page *and* write it to the cache) must call
//! [`Response::try_clone`] before the body is consumed.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level page navigation
  Navigate,
  SameOrigin,
  #[default]
  NoCors,
}

/// An intercepted (or worker-issued) HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl Request {
  /// Plain GET subresource request.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      mode: RequestMode::NoCors,
      headers: Vec::new(),
      body: None,
    }
  }

  /// GET issued by a page navigation.
  pub fn navigate(url: Url) -> Self {
    Self {
      mode: RequestMode::Navigate,
      ..Self::get(url)
    }
  }

  /// POST with a JSON-encoded body.
  pub fn post_json<T: Serialize>(url: Url, payload: &T) -> Result<Self> {
    let body =
      serde_json::to_vec(payload).map_err(|e| eyre!("Failed to encode request body: {}", e))?;

    Ok(Self {
      method: Method::POST,
      url,
      mode: RequestMode::SameOrigin,
      headers: vec![("Content-Type".to_string(), "application/json".to_string())],
      body: Some(body),
    })
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }
}

/// Response body that can be taken once.
#[derive(Debug)]
pub struct Body {
  bytes: Option<Vec<u8>>,
}

impl Body {
  pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
    Self {
      bytes: Some(bytes.into()),
    }
  }

  #[cfg(test)]
  pub fn is_used(&self) -> bool {
    self.bytes.is_none()
  }

  fn take(&mut self) -> Result<Vec<u8>> {
    self
      .bytes
      .take()
      .ok_or_else(|| eyre!("Response body has already been consumed"))
  }

  fn peek(&self) -> Result<&[u8]> {
    self
      .bytes
      .as_deref()
      .ok_or_else(|| eyre!("Response body has already been consumed"))
  }
}

/// An HTTP response, either from the network, from the cache, or synthesized offline.
///
/// Deliberately not `Clone`: use [`Response::try_clone`].
#[derive(Debug)]
pub struct Response {
  pub status: u16,
  pub status_text: String,
  pub headers: Vec<(String, String)>,
  body: Body,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      status_text: default_status_text(status).to_string(),
      headers: Vec::new(),
      body: Body::new(body),
    }
  }

  /// Build a response from its parts, e.g. when reading it back out of the cache.
  pub fn from_parts(
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
  ) -> Self {
    Self {
      status,
      status_text,
      headers,
      body: Body::new(body),
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_status_text(mut self, status_text: &str) -> Self {
    self.status_text = status_text.to_string();
    self
  }

  /// Case-insensitive header lookup (first match).
  #[allow(dead_code)]
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// True for any 2xx status.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Duplicate this response into an independently consumable copy.
  ///
  /// Fails if the body has already been read.
  pub fn try_clone(&self) -> Result<Self> {
    let bytes = self.body.peek()?;
    Ok(Self {
      status: self.status,
      status_text: self.status_text.clone(),
      headers: self.headers.clone(),
      body: Body::new(bytes),
    })
  }

  /// Take the body bytes, leaving the response marked as used.
  pub fn take_body(&mut self) -> Result<Vec<u8>> {
    self.body.take()
  }

  pub fn bytes(mut self) -> Result<Vec<u8>> {
    self.body.take()
  }

  pub fn text(self) -> Result<String> {
    let bytes = self.bytes()?;
    String::from_utf8(bytes).map_err(|e| eyre!("Response body is not valid UTF-8: {}", e))
  }

  #[allow(dead_code)]
  pub fn json<T: DeserializeOwned>(self) -> Result<T> {
    let bytes = self.bytes()?;
    serde_json::from_slice(&bytes).map_err(|e| eyre!("Failed to parse response JSON: {}", e))
  }
}

fn default_status_text(status: u16) -> &'static str {
  reqwest::StatusCode::from_u16(status)
    .ok()
    .and_then(|s| s.canonical_reason())
    .unwrap_or("")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_body_can_only_be_taken_once() {
    let mut response = Response::new(200, "hello");
    assert!(!response.body.is_used());
    assert_eq!(response.take_body().unwrap(), b"hello");
    assert!(response.body.is_used());
    assert!(response.take_body().is_err());
  }

  #[test]
  fn test_try_clone_gives_independent_bodies() {
    let response = Response::new(200, "payload").with_header("Content-Type", "text/plain");
    let copy = response.try_clone().unwrap();

    assert_eq!(copy.status, response.status);
    assert_eq!(copy.headers, response.headers);
    assert_eq!(copy.text().unwrap(), "payload");
    assert_eq!(response.text().unwrap(), "payload");
  }

  #[test]
  fn test_try_clone_after_consumption_fails() {
    let mut response = Response::new(200, "gone");
    response.take_body().unwrap();
    assert!(response.try_clone().is_err());
  }

  #[test]
  fn test_header_lookup_is_case_insensitive() {
    let response = Response::new(200, "").with_header("Content-Type", "text/html");
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.header("etag"), None);
  }

  #[test]
  fn test_status_text_defaults_to_reason_phrase() {
    assert_eq!(Response::new(503, "").status_text, "Service Unavailable");
    assert_eq!(Response::new(200, "").status_text, "OK");
  }

  #[test]
  fn test_post_json_sets_content_type() {
    let request =
      Request::post_json(url("http://localhost/api/x"), &serde_json::json!({"a": 1})).unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.body.as_deref(), Some(&b"{\"a\":1}"[..]));
    assert!(request
      .headers
      .iter()
      .any(|(k, v)| k == "Content-Type" && v == "application/json"));
  }

  #[test]
  fn test_navigate_mode() {
    assert!(Request::navigate(url("http://localhost/")).is_navigation());
    assert!(!Request::get(url("http://localhost/")).is_navigation());
  }
}
