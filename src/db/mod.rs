//! Pending attendance queue.
//!
//! Check-ins captured while offline wait here until a background sync
//! submits them.

pub mod schema;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// One offline check-in awaiting submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAttendance {
  pub id: i64,
  pub student_id: i64,
  pub class_id: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  pub captured_at: DateTime<Utc>,
}

/// Storage for queued check-ins.
pub trait PendingStore: Send + Sync {
  /// All queued records, oldest first.
  fn pending(&self) -> Result<Vec<PendingAttendance>>;

  /// Queue a new check-in and return its id.
  fn enqueue(&self, student_id: i64, class_id: i64, notes: Option<&str>) -> Result<i64>;

  /// Remove a record after successful submission. Returns false if it was not queued.
  fn remove(&self, id: i64) -> Result<bool>;
}

/// Database connection wrapper for the queue
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at `path`
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  #[allow(dead_code)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;
    Ok(db)
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }
}

impl PendingStore for Database {
  fn pending(&self) -> Result<Vec<PendingAttendance>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT id, student_id, class_id, notes, captured_at FROM pending_attendance
         ORDER BY id",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, i64>(1)?,
          row.get::<_, i64>(2)?,
          row.get::<_, Option<String>>(3)?,
          row.get::<_, String>(4)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query pending attendance: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read pending attendance: {}", e))?;

    rows
      .into_iter()
      .map(|(id, student_id, class_id, notes, captured_at)| {
        Ok(PendingAttendance {
          id,
          student_id,
          class_id,
          notes,
          captured_at: parse_datetime(&captured_at)?,
        })
      })
      .collect()
  }

  fn enqueue(&self, student_id: i64, class_id: i64, notes: Option<&str>) -> Result<i64> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    conn
      .execute(
        "INSERT INTO pending_attendance (student_id, class_id, notes) VALUES (?, ?, ?)",
        params![student_id, class_id, notes],
      )
      .map_err(|e| eyre!("Failed to queue check-in: {}", e))?;

    Ok(conn.last_insert_rowid())
  }

  fn remove(&self, id: i64) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute("DELETE FROM pending_attendance WHERE id = ?", params![id])
      .map_err(|e| eyre!("Failed to remove pending record {}: {}", id, e))?;

    Ok(removed > 0)
  }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_queue_is_empty() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.pending().unwrap().is_empty());
  }

  #[test]
  fn test_enqueue_and_list_in_order() {
    let db = Database::open_in_memory().unwrap();
    let first = db.enqueue(7, 3, Some("late")).unwrap();
    let second = db.enqueue(8, 3, None).unwrap();

    let pending = db.pending().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first);
    assert_eq!(pending[0].student_id, 7);
    assert_eq!(pending[0].notes.as_deref(), Some("late"));
    assert_eq!(pending[1].id, second);
    assert_eq!(pending[1].notes, None);
  }

  #[test]
  fn test_blank_notes_are_dropped() {
    let db = Database::open_in_memory().unwrap();
    db.enqueue(1, 1, Some("   ")).unwrap();
    assert_eq!(db.pending().unwrap()[0].notes, None);
  }

  #[test]
  fn test_remove() {
    let db = Database::open_in_memory().unwrap();
    let id = db.enqueue(1, 2, None).unwrap();

    assert!(db.remove(id).unwrap());
    assert!(!db.remove(id).unwrap());
    assert!(db.pending().unwrap().is_empty());
  }

  #[test]
  fn test_serializes_as_checkin_body() {
    let record = PendingAttendance {
      id: 4,
      student_id: 12,
      class_id: 5,
      notes: None,
      captured_at: parse_datetime("2024-05-01 18:30:00").unwrap(),
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["student_id"], 12);
    assert_eq!(json["class_id"], 5);
    assert!(json.get("notes").is_none());
  }
}
