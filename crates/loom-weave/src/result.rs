//! Weave result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a node ended a weave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
  Done,
  Error,
  Skipped,
}

/// Why a node was not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// A guard yarn into the node was closed.
  GuardClosed { guard_id: String },
  /// None of the node's upstream nodes reached `done`.
  UpstreamFailed,
  /// The weave was cancelled before the node's turn.
  Cancelled,
}

/// Why a node failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
  pub message: String,
  /// The handler could not reach its delegate, so the work was never attempted.
  pub delegate_unreachable: bool,
}

/// One entry of a weave, in completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
  pub node_id: String,
  pub name: String,
  pub status: TerminalStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<NodeFailure>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skipped: Option<SkipReason>,
  pub duration_ms: u64,
}

/// Aggregate health of a weave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaveStatus {
  /// Every node reached `done`.
  Success,
  /// Some nodes reached `done`, others did not.
  Partial,
  /// No node reached `done`.
  Failed,
}

impl WeaveStatus {
  pub fn from_outcomes(outcomes: &[NodeOutcome], cancelled: bool) -> Self {
    let done = outcomes
      .iter()
      .filter(|o| o.status == TerminalStatus::Done)
      .count();

    if done == outcomes.len() {
      WeaveStatus::Success
    } else if done > 0 || cancelled {
      WeaveStatus::Partial
    } else {
      WeaveStatus::Failed
    }
  }
}

/// Immutable record of one weave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaveResult {
  pub weave_id: String,
  pub loom: String,
  pub status: WeaveStatus,
  /// Node outcomes in the order the nodes completed.
  pub outcomes: Vec<NodeOutcome>,
  pub cancelled: bool,
  /// Caller-supplied inputs, keyed by node id or name.
  #[serde(default)]
  pub initial_inputs: Map<String, Value>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl WeaveResult {
  pub fn outcome(&self, node_id: &str) -> Option<&NodeOutcome> {
    self.outcomes.iter().find(|o| o.node_id == node_id)
  }

  /// Node ids in completion order.
  pub fn completion_order(&self) -> Vec<&str> {
    self.outcomes.iter().map(|o| o.node_id.as_str()).collect()
  }

  pub fn count(&self, status: TerminalStatus) -> usize {
    self.outcomes.iter().filter(|o| o.status == status).count()
  }

  /// Fraction of attempted nodes that errored or were skipped.
  pub fn failure_fraction(&self) -> f64 {
    if self.outcomes.is_empty() {
      return 0.0;
    }
    let failed = self.outcomes.len() - self.count(TerminalStatus::Done);
    failed as f64 / self.outcomes.len() as f64
  }
}
