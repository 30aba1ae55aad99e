use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Origin the worker is registered for (scheme + host + port)
  pub origin: String,
  /// Cache generation name; bumping it invalidates every cached entry
  pub cache_name: String,
  /// URLs cached on install. Paths are resolved against `origin`.
  pub precache: Vec<String>,
  /// Cross-origin hosts (substring match) that are still intercepted
  pub cdn_hosts: Vec<String>,
  /// Path fragment that marks an API call
  pub api_marker: String,
  pub offline_page: String,
  pub sync: SyncConfig,
  pub notifications: NotificationConfig,
  /// SQLite file for caches and the pending queue (default: $XDG_DATA_HOME/attendsw/worker.db)
  pub database: Option<PathBuf>,
  /// Directory for rolling log files (default: $XDG_DATA_HOME/attendsw/logs)
  pub log_dir: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: "http://localhost:5000".to_string(),
      cache_name: "attenddance-v1.0.0".to_string(),
      precache: [
        "/",
        "/dashboard",
        "/students",
        "/classes",
        "/attendance",
        "/auth/login",
        "/static/manifest.json",
        "https://cdn.tailwindcss.com",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
        "https://unpkg.com/alpinejs@3.x.x/dist/cdn.min.js",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      cdn_hosts: ["cdn.tailwindcss.com", "cdnjs.cloudflare.com", "unpkg.com"]
        .into_iter()
        .map(String::from)
        .collect(),
      api_marker: "/api/".to_string(),
      offline_page: "/offline.html".to_string(),
      sync: SyncConfig::default(),
      notifications: NotificationConfig::default(),
      database: None,
      log_dir: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Background sync tag that triggers submission of queued check-ins
  pub tag: String,
  /// Check-in submission endpoint, relative to `origin`
  pub endpoint: String,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      tag: "attendance-sync".to_string(),
      endpoint: "/api/attendance/checkin".to_string(),
    }
  }
}

/// Defaults applied to push payloads that leave fields out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      title: "AttenDANCE".to_string(),
      body: "New notification from AttenDANCE".to_string(),
      icon: "/static/icons/icon-192x192.png".to_string(),
      badge: "/static/icons/icon-96x96.png".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./attendsw.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/attendsw/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("attendsw.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("attendsw").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.origin_url()?;
    Ok(config)
  }

  /// The configured origin as a parsed URL.
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Path of the SQLite database file.
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("worker.db")),
    }
  }

  /// Directory for log files.
  pub fn log_path(&self) -> Result<PathBuf> {
    match &self.log_dir {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("logs")),
    }
  }

  /// Get the application session cookie from the environment.
  ///
  /// Checks ATTENDSW_SESSION. Submissions to login-protected endpoints fail
  /// without it, which leaves records queued.
  pub fn get_session_cookie() -> Option<String> {
    std::env::var("ATTENDSW_SESSION")
      .ok()
      .filter(|s| !s.trim().is_empty())
  }
}

fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("attendsw"))
}
