//! Per-loom state held by the index.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use loom_graph::Loom;
use loom_molt::{MoltRecord, MoltSnapshot, PhaseCell};
use loom_weave::WeaveResult;

use crate::error::IndexError;

pub(crate) struct LoomSlot {
  pub name: String,
  /// The working copy. Holding this lock makes the caller the loom's writer.
  writer: tokio::sync::Mutex<Loom>,
  /// Copy of the working loom as of the last completed write.
  published: RwLock<Arc<Loom>>,
  history: Mutex<VecDeque<WeaveResult>>,
  snapshots: Mutex<VecDeque<MoltSnapshot>>,
  /// Trimmed with `snapshots` so every record's snapshot is still held.
  audit: Mutex<VecDeque<MoltRecord>>,
  pub phase: PhaseCell,
}

impl LoomSlot {
  pub fn new(loom: Loom) -> Self {
    Self {
      name: loom.name.clone(),
      phase: PhaseCell::new(loom.name.clone()),
      published: RwLock::new(Arc::new(loom.clone())),
      writer: tokio::sync::Mutex::new(loom),
      history: Mutex::new(VecDeque::new()),
      snapshots: Mutex::new(VecDeque::new()),
      audit: Mutex::new(VecDeque::new()),
    }
  }

  /// Become the loom's writer, waiting at most `timeout`.
  pub async fn lock(&self, timeout: Duration) -> Result<tokio::sync::MutexGuard<'_, Loom>, IndexError> {
    tokio::time::timeout(timeout, self.writer.lock())
      .await
      .map_err(|_| {
        tracing::warn!(loom = %self.name, timeout_ms = timeout.as_millis() as u64, "writer lock timed out");
        IndexError::LockTimeout {
          loom: self.name.clone(),
          timeout_ms: timeout.as_millis() as u64,
        }
      })
  }

  /// Make `loom` visible to readers.
  pub fn publish(&self, loom: &Loom) {
    *self.published.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(loom.clone());
  }

  pub fn snapshot(&self) -> Arc<Loom> {
    self
      .published
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn push_history(&self, result: WeaveResult, limit: usize) {
    let mut history = recover(&self.history);
    history.push_back(result);
    while history.len() > limit.max(1) {
      history.pop_front();
    }
  }

  /// Weave history, oldest first.
  pub fn history(&self) -> Vec<WeaveResult> {
    recover(&self.history).iter().cloned().collect()
  }

  pub fn history_len(&self) -> usize {
    recover(&self.history).len()
  }

  pub fn push_snapshot(&self, snapshot: MoltSnapshot, limit: usize) {
    let mut snapshots = recover(&self.snapshots);
    snapshots.push_back(snapshot);
    while snapshots.len() > limit.max(1) {
      snapshots.pop_front();
    }
  }

  pub fn snapshots(&self) -> Vec<MoltSnapshot> {
    recover(&self.snapshots).iter().cloned().collect()
  }

  pub fn push_audit(&self, record: MoltRecord, limit: usize) {
    let mut audit = recover(&self.audit);
    audit.push_back(record);
    while audit.len() > limit.max(1) {
      audit.pop_front();
    }
  }

  /// Molt records, oldest first.
  pub fn audit(&self) -> Vec<MoltRecord> {
    recover(&self.audit).iter().cloned().collect()
  }
}

/// Lock a std mutex that only guards plain collections.
fn recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}
