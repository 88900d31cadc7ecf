//! Molt audit records.

use chrono::{DateTime, Utc};
use loom_config::LoomDef;
use loom_weave::WeaveResult;
use serde::{Deserialize, Serialize};

use crate::drift::MoltDecision;

/// A rewind point taken before a molt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoltSnapshot {
  pub snapshot_id: String,
  pub definition: LoomDef,
  /// Length of the loom's weave history when the snapshot was taken.
  pub history_len: usize,
  pub taken_at: DateTime<Utc>,
}

impl MoltSnapshot {
  pub fn take(definition: LoomDef, history_len: usize) -> Self {
    Self {
      snapshot_id: uuid::Uuid::new_v4().to_string(),
      definition,
      history_len,
      taken_at: Utc::now(),
    }
  }
}

/// What a molt did and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoltRecord {
  pub molt_id: String,
  pub loom: String,
  pub reason: String,
  /// Present when the molt was triggered by an evaluation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub triggering_decision: Option<MoltDecision>,
  pub before_snapshot_id: String,
  pub after_weave: WeaveResult,
  pub timestamp: DateTime<Utc>,
}

impl MoltRecord {
  pub fn new(
    reason: impl Into<String>,
    triggering_decision: Option<MoltDecision>,
    snapshot: &MoltSnapshot,
    after_weave: WeaveResult,
  ) -> Self {
    Self {
      molt_id: uuid::Uuid::new_v4().to_string(),
      loom: after_weave.loom.clone(),
      reason: reason.into(),
      triggering_decision,
      before_snapshot_id: snapshot.snapshot_id.clone(),
      after_weave,
      timestamp: Utc::now(),
    }
  }
}
