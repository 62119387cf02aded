//! Background recalculation queue.
//!
//! Handlers enqueue an assignment id and return. A single worker task drains
//! the queue: after the first job arrives it waits `SETTLE` so the triggering
//! response is written out first, then recalculates every distinct assignment
//! queued in the meantime once. Failures are logged, never returned.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::completion::recalculate;
use crate::store::DataStore;

/// Delay between receiving a job and touching the store.
const SETTLE: Duration = Duration::from_millis(25);

#[derive(Clone)]
pub struct RecalcQueue {
  tx: mpsc::UnboundedSender<String>,
}

impl RecalcQueue {
  /// Spawn the worker on the current tokio runtime.
  pub fn spawn(store: Arc<dyn DataStore>) -> Self {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
      info!(target: "grading", "Recalculation worker started");
      while let Some(first) = rx.recv().await {
        tokio::time::sleep(SETTLE).await;
        let mut batch = BTreeSet::from([first]);
        while let Ok(next) = rx.try_recv() {
          batch.insert(next);
        }
        for assignment_id in batch {
          match recalculate(store.as_ref(), &assignment_id).await {
            Ok(Some(m)) => debug!(target: "grading", %assignment_id, count = m.submission_count, rate = m.completion_rate, "Background recalculation done"),
            Ok(None) => debug!(target: "grading", %assignment_id, "Background recalculation skipped"),
            Err(e) => error!(target: "grading", %assignment_id, error = %e, "Background recalculation failed"),
          }
        }
      }
      info!(target: "grading", "Recalculation worker stopped");
    });
    Self { tx }
  }

  /// Fire-and-forget. A dead worker is logged and otherwise ignored.
  pub fn schedule(&self, assignment_id: &str) {
    if let Err(e) = self.tx.send(assignment_id.to_string()) {
      warn!(target: "grading", assignment_id = %e.0, "Recalculation worker gone; dropping job");
    }
  }
}
