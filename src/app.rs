use color_eyre::{eyre::eyre, Result};
use reqwest::Method;

use crate::cache::{CacheStore, SqliteStorage};
use crate::commands::Command;
use crate::config::Config;
use crate::db::{Database, PendingStore};
use crate::event::{EventOutcome, FetchOutcome, WorkerEvent};
use crate::http::{HttpClient, Network, Request, Response};
use crate::worker::{ConsoleHost, ServiceWorker};

type Worker = ServiceWorker<SqliteStorage, HttpClient, Database, ConsoleHost>;

/// Drives the worker from the command line: each invocation delivers one event.
pub struct App {
  worker: Worker,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let db_path = config.database_path()?;
    let storage = SqliteStorage::open(&db_path)?;
    let pending = Database::open(&db_path)?;
    let network = HttpClient::new(Config::get_session_cookie().as_deref())?;

    let worker = ServiceWorker::new(&config, storage, network, pending, ConsoleHost)?;
    Ok(Self { worker })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Install => {
        self.worker.handle(WorkerEvent::Install).await;
        self.activate_if_ready().await;
        println!("{} {:?}", self.worker.cache().generation(), self.worker.state());
      }
      Command::Activate => {
        self.worker.handle(WorkerEvent::Activate).await;
      }
      Command::Fetch {
        url,
        navigate,
        method,
      } => self.fetch(&url, navigate, &method).await?,
      Command::Sync { tag } => {
        let report = self.worker.sync(&tag).await;
        println!(
          "submitted {}, rejected {}, failed {}",
          report.submitted, report.rejected, report.failed
        );
      }
      Command::Push { payload } => {
        let data = payload.map(String::into_bytes);
        self.worker.handle(WorkerEvent::Push { data }).await;
      }
      Command::Click { action } => {
        let notification = self.worker.default_notification();
        self
          .worker
          .handle(WorkerEvent::NotificationClick {
            notification,
            action,
          })
          .await;
      }
      Command::Message { json } => {
        let data: serde_json::Value =
          serde_json::from_str(&json).map_err(|e| eyre!("Message is not valid JSON: {}", e))?;
        self.worker.handle(WorkerEvent::Message(data)).await;
        self.activate_if_ready().await;
      }
      Command::Enqueue {
        student_id,
        class_id,
        notes,
      } => {
        let id = self
          .worker
          .pending()
          .enqueue(student_id, class_id, notes.as_deref())?;
        println!("queued check-in #{}", id);
      }
      Command::Pending => self.list_pending()?,
      Command::Caches => self.list_caches()?,
    }

    Ok(())
  }

  /// Installed workers that skipped waiting are activated right away.
  async fn activate_if_ready(&self) {
    if self.worker.ready_to_activate() {
      self.worker.handle(WorkerEvent::Activate).await;
    }
  }

  async fn fetch(&self, url: &str, navigate: bool, method: &str) -> Result<()> {
    let url = self.worker.scope().resolve(url)?;
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
      .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;

    let request = if navigate {
      Request::navigate(url)
    } else {
      Request::get(url)
    }
    .with_method(method);

    match self.worker.handle(WorkerEvent::Fetch(request.clone())).await {
      EventOutcome::Fetch(FetchOutcome::Respond { response, source }) => {
        print_response(&source.to_string(), response)
      }
      _ => {
        // Not intercepted: default network handling
        let response = self.worker.network().fetch(&request).await?;
        print_response("passthrough", response)
      }
    }
  }

  fn list_pending(&self) -> Result<()> {
    let pending = self.worker.pending().pending()?;
    if pending.is_empty() {
      println!("no pending check-ins");
    }
    for record in pending {
      println!(
        "#{} student={} class={} captured={}{}",
        record.id,
        record.student_id,
        record.class_id,
        record.captured_at.format("%Y-%m-%d %H:%M:%S"),
        record
          .notes
          .map(|n| format!(" notes={:?}", n))
          .unwrap_or_default()
      );
    }
    Ok(())
  }

  fn list_caches(&self) -> Result<()> {
    let cache = self.worker.cache();
    for name in cache.storage().generations()? {
      let marker = if name == cache.generation() { "*" } else { " " };
      println!("{} {}", marker, name);
    }
    for key in cache.keys()? {
      println!("    {} {}", key.method, key.url);
    }
    Ok(())
  }
}

fn print_response(source: &str, response: Response) -> Result<()> {
  println!("{} {} ({})", response.status, response.status_text, source);
  for (name, value) in &response.headers {
    println!("{}: {}", name, value);
  }
  println!();
  let body = response.bytes()?;
  println!("{}", String::from_utf8_lossy(&body));
  Ok(())
}
