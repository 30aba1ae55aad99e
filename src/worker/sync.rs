//! Background sync of check-ins captured offline.

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, error, info, warn};

use super::{Host, ServiceWorker};
use crate::cache::CacheStore;
use crate::db::{PendingAttendance, PendingStore};
use crate::http::{Network, Request};

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub submitted: usize,
  /// Refused by the server with a 4xx and dropped from the queue
  pub rejected: usize,
  /// Left queued for the next pass
  pub failed: usize,
}

enum Submission {
  Accepted,
  Rejected { status: u16, body: String },
}

impl<S, N, P, H> ServiceWorker<S, N, P, H>
where
  S: CacheStore,
  N: Network,
  P: PendingStore,
  H: Host,
{
  /// Handle a background sync event. Only the attendance tag does any work.
  pub async fn sync(&self, tag: &str) -> SyncReport {
    info!(tag, "Background sync");
    if tag != self.sync_tag {
      debug!(tag, "Ignoring unknown sync tag");
      return SyncReport::default();
    }
    self.sync_attendance().await
  }

  /// Submit every queued check-in.
  ///
  /// Accepted (2xx) and rejected (4xx) records leave the queue. Transport
  /// errors, redirects and 5xx responses keep the record for the next pass.
  pub async fn sync_attendance(&self) -> SyncReport {
    let mut report = SyncReport::default();

    let pending = match self.pending.pending() {
      Ok(pending) => pending,
      Err(e) => {
        error!("Error during background sync: {:#}", e);
        return report;
      }
    };
    if pending.is_empty() {
      return report;
    }

    info!(count = pending.len(), "Syncing pending attendance data");
    for record in &pending {
      match self.submit(record).await {
        Ok(Submission::Accepted) => {
          report.submitted += 1;
          self.dequeue(record);
        }
        Ok(Submission::Rejected { status, body }) => {
          report.rejected += 1;
          warn!(id = record.id, status, "Check-in rejected, dropping it: {}", body);
          self.dequeue(record);
        }
        Err(e) => {
          report.failed += 1;
          error!(id = record.id, "Failed to sync attendance: {:#}", e);
        }
      }
    }

    report
  }

  fn dequeue(&self, record: &PendingAttendance) {
    match self.pending.remove(record.id) {
      Ok(_) => debug!(id = record.id, "Removed synced record"),
      Err(e) => warn!(id = record.id, "Failed to remove synced record: {:#}", e),
    }
  }

  async fn submit(&self, record: &PendingAttendance) -> Result<Submission> {
    let request = Request::post_json(self.sync_endpoint.clone(), record)?;
    let response = self.network.fetch(&request).await?;

    let status = response.status;
    if response.ok() {
      return Ok(Submission::Accepted);
    }
    let body = response.text().unwrap_or_default();
    if (400..500).contains(&status) {
      return Ok(Submission::Rejected { status, body });
    }
    Err(eyre!("Check-in failed with status {}: {}", status, body))
  }
}
