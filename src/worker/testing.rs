//! In-process fakes for exercising the worker without a network or a browser.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use super::{Host, Notification, ServiceWorker};
use crate::cache::SqliteStorage;
use crate::config::Config;
use crate::db::Database;
use crate::http::{Network, Request, Response};

pub const ORIGIN: &str = "http://localhost:5000";

#[derive(Default)]
struct NetworkState {
  routes: HashMap<String, (u16, Vec<(String, String)>, Vec<u8>)>,
  offline: bool,
  requests: Vec<Request>,
}

/// Network with canned per-URL responses. Unknown URLs fail like a refused connection.
#[derive(Clone, Default)]
pub struct FakeNetwork {
  state: Arc<Mutex<NetworkState>>,
}

impl FakeNetwork {
  pub fn respond(&self, url: &str, status: u16, body: &str) {
    self.respond_with(url, status, Vec::new(), body);
  }

  pub fn respond_with(&self, url: &str, status: u16, headers: Vec<(String, String)>, body: &str) {
    self
      .state
      .lock()
      .unwrap()
      .routes
      .insert(url.to_string(), (status, headers, body.as_bytes().to_vec()));
  }

  pub fn set_offline(&self, offline: bool) {
    self.state.lock().unwrap().offline = offline;
  }

  /// URLs of every request issued so far.
  pub fn calls(&self) -> Vec<String> {
    self
      .state
      .lock()
      .unwrap()
      .requests
      .iter()
      .map(|r| r.url.to_string())
      .collect()
  }

  pub fn requests(&self) -> Vec<Request> {
    self.state.lock().unwrap().requests.clone()
  }
}

impl Network for FakeNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let mut state = self.state.lock().unwrap();
    state.requests.push(request.clone());

    if state.offline {
      return Err(eyre!("network is offline"));
    }

    match state.routes.get(request.url.as_str()) {
      Some((status, headers, body)) => {
        let status_text = reqwest::StatusCode::from_u16(*status)
          .ok()
          .and_then(|s| s.canonical_reason())
          .unwrap_or("")
          .to_string();
        Ok(Response::from_parts(
          *status,
          status_text,
          headers.clone(),
          body.clone(),
        ))
      }
      None => Err(eyre!("connection refused: {}", request.url)),
    }
  }
}

#[derive(Default)]
struct HostLog {
  claims: usize,
  shown: Vec<Notification>,
  closed: usize,
  opened: Vec<String>,
}

/// Host that records every call.
#[derive(Clone, Default)]
pub struct RecordingHost {
  log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
  pub fn claims(&self) -> usize {
    self.log.lock().unwrap().claims
  }

  pub fn shown(&self) -> Vec<Notification> {
    self.log.lock().unwrap().shown.clone()
  }

  pub fn closed(&self) -> usize {
    self.log.lock().unwrap().closed
  }

  pub fn opened(&self) -> Vec<String> {
    self.log.lock().unwrap().opened.clone()
  }
}

impl Host for RecordingHost {
  fn claim_clients(&self) -> Result<()> {
    self.log.lock().unwrap().claims += 1;
    Ok(())
  }

  fn open_window(&self, url: &Url) -> Result<()> {
    self.log.lock().unwrap().opened.push(url.to_string());
    Ok(())
  }

  fn show_notification(&self, notification: &Notification) -> Result<()> {
    self.log.lock().unwrap().shown.push(notification.clone());
    Ok(())
  }

  fn close_notification(&self, _notification: &Notification) -> Result<()> {
    self.log.lock().unwrap().closed += 1;
    Ok(())
  }
}

pub type TestWorker = ServiceWorker<SqliteStorage, FakeNetwork, Database, RecordingHost>;

pub struct Fixture {
  pub worker: TestWorker,
  pub network: FakeNetwork,
  pub host: RecordingHost,
}

/// Worker over in-memory storage and the given network.
pub fn worker_with<N: Network>(
  config: &Config,
  network: N,
) -> ServiceWorker<SqliteStorage, N, Database, RecordingHost> {
  build(config, network, RecordingHost::default())
}

fn build<N: Network>(
  config: &Config,
  network: N,
  host: RecordingHost,
) -> ServiceWorker<SqliteStorage, N, Database, RecordingHost> {
  ServiceWorker::new(
    config,
    SqliteStorage::open_in_memory().unwrap(),
    network,
    Database::open_in_memory().unwrap(),
    host,
  )
  .unwrap()
}

/// Worker with default configuration, in-memory storage and fakes.
pub fn fixture() -> Fixture {
  fixture_with(Config {
    origin: ORIGIN.to_string(),
    ..Config::default()
  })
}

pub fn fixture_with(config: Config) -> Fixture {
  let network = FakeNetwork::default();
  let host = RecordingHost::default();
  let worker = build(&config, network.clone(), host.clone());

  Fixture {
    worker,
    network,
    host,
  }
}
