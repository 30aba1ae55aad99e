use std::future::Future;

use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderName, HeaderValue, COOKIE, USER_AGENT};

use super::types::{Request, Response};

/// Anything that can carry a request to the network.
///
/// An `Err` means the request never produced an HTTP response (DNS failure,
/// refused connection, reset). Any HTTP status, including 5xx, is an `Ok`.
pub trait Network: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// `reqwest`-backed network client.
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
}

impl HttpClient {
  /// Create a client. When a session cookie is given it is sent with every request.
  pub fn new(session_cookie: Option<&str>) -> Result<Self> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("attendsw/", env!("CARGO_PKG_VERSION"))),
    );
    if let Some(cookie) = session_cookie {
      let value =
        HeaderValue::from_str(cookie).map_err(|e| eyre!("Invalid session cookie: {}", e))?;
      headers.insert(COOKIE, value);
    }

    // Redirects are handed back to the worker as-is, like a browser's manual
    // redirect mode; following them would cache the target under the wrong key.
    let client = reqwest::Client::builder()
      .default_headers(headers)
      .redirect(reqwest::redirect::Policy::none())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Network for HttpClient {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());

    for (name, value) in &request.headers {
      let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| eyre!("Invalid header name {}: {}", name, e))?;
      let value =
        HeaderValue::from_str(value).map_err(|e| eyre!("Invalid header value: {}", e))?;
      builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", request.url, e))?;

    let status = response.status();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body from {}: {}", request.url, e))?;

    Ok(Response::from_parts(
      status.as_u16(),
      status.canonical_reason().unwrap_or("").to_string(),
      headers,
      body.to_vec(),
    ))
  }
}
