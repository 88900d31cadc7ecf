//! The loom index.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use loom_config::{LoomDef, Settings};
use loom_graph::{GraphError, Loom, Node, NodeKind, Position, Topology, YarnKind};
use loom_molt::{MoltDecision, MoltPhase, MoltRecord, MoltSnapshot, PhaseGuard};
use loom_weave::{WeaveResult, WeaveStatus, Weaver};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::IndexError;
use crate::slot::LoomSlot;

/// Limits the index applies to every loom.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOptions {
  pub history_limit: usize,
  pub snapshot_limit: usize,
  pub lock_timeout: Duration,
  pub drift_window: usize,
}

impl From<&Settings> for IndexOptions {
  fn from(settings: &Settings) -> Self {
    Self {
      history_limit: settings.history_limit,
      snapshot_limit: settings.snapshot_limit,
      lock_timeout: Duration::from_millis(settings.lock_timeout_ms),
      drift_window: settings.drift_window,
    }
  }
}

impl Default for IndexOptions {
  fn default() -> Self {
    Self::from(&Settings::default())
  }
}

/// One row of [`LoomIndex::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoomSummary {
  pub name: String,
  pub nodes: usize,
  pub yarns: usize,
  pub weaves: usize,
  pub phase: MoltPhase,
}

/// Result of an evaluate-then-maybe-molt pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoltOutcome {
  pub decision: MoltDecision,
  /// Present when the decision recommended a molt.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub record: Option<MoltRecord>,
}

/// Every loom, by name.
pub struct LoomIndex {
  options: IndexOptions,
  weaver: Weaver,
  looms: RwLock<BTreeMap<String, Arc<LoomSlot>>>,
}

impl LoomIndex {
  pub fn new(options: IndexOptions, weaver: Weaver) -> Self {
    Self {
      options,
      weaver,
      looms: RwLock::new(BTreeMap::new()),
    }
  }

  pub fn options(&self) -> &IndexOptions {
    &self.options
  }

  /// Create an empty loom.
  pub fn create(&self, name: &str) -> Result<(), IndexError> {
    self.insert(Loom::new(name))
  }

  /// Create the loom if it does not exist yet.
  pub fn ensure(&self, name: &str) -> Result<(), IndexError> {
    match self.create(name) {
      Err(IndexError::LoomExists { .. }) => Ok(()),
      other => other,
    }
  }

  /// Build a loom from a definition and add it.
  pub fn import(&self, def: LoomDef) -> Result<String, IndexError> {
    let loom = Loom::from_def(def)?;
    let name = loom.name.clone();
    self.insert(loom)?;
    info!(loom = %name, "loom imported");
    Ok(name)
  }

  fn insert(&self, loom: Loom) -> Result<(), IndexError> {
    if loom.name.trim().is_empty() {
      return Err(IndexError::InvalidName(loom.name));
    }

    let mut looms = self.looms.write().unwrap_or_else(|e| e.into_inner());
    if looms.contains_key(&loom.name) {
      return Err(IndexError::LoomExists { loom: loom.name });
    }
    looms.insert(loom.name.clone(), Arc::new(LoomSlot::new(loom)));
    Ok(())
  }

  pub fn list(&self) -> Vec<LoomSummary> {
    let looms = self.looms.read().unwrap_or_else(|e| e.into_inner());
    looms
      .values()
      .map(|slot| {
        let loom = slot.snapshot();
        LoomSummary {
          name: slot.name.clone(),
          nodes: loom.node_count(),
          yarns: loom.edge_count(),
          weaves: slot.history_len(),
          phase: slot.phase.current(),
        }
      })
      .collect()
  }

  /// The loom as of its last completed write.
  pub fn snapshot(&self, name: &str) -> Result<Arc<Loom>, IndexError> {
    Ok(self.slot(name)?.snapshot())
  }

  pub fn topology(&self, name: &str) -> Result<Topology, IndexError> {
    Ok(self.snapshot(name)?.topology())
  }

  pub fn export(&self, name: &str) -> Result<LoomDef, IndexError> {
    Ok(self.snapshot(name)?.to_def())
  }

  pub async fn add_node(
    &self,
    loom: &str,
    name: &str,
    kind: NodeKind,
    position: Option<Position>,
  ) -> Result<String, IndexError> {
    let name = name.to_string();
    let node_id = self
      .mutate(loom, move |l| Ok(l.add_node(name, kind, position)))
      .await?;
    info!(loom, node_id = %node_id, "node added");
    Ok(node_id)
  }

  /// Returns `false` when the yarn already existed.
  pub async fn connect(&self, loom: &str, source: &str, target: &str, kind: YarnKind) -> Result<bool, IndexError> {
    self.mutate(loom, |l| l.connect(source, target, kind)).await
  }

  /// Returns `false` when there was no such yarn.
  pub async fn disconnect(&self, loom: &str, source: &str, target: &str, kind: YarnKind) -> Result<bool, IndexError> {
    self.mutate(loom, |l| l.disconnect(source, target, kind)).await
  }

  pub async fn remove_node(&self, loom: &str, node_id: &str) -> Result<Node, IndexError> {
    let node = self.mutate(loom, |l| l.remove_node(node_id)).await?;
    info!(loom, node_id, "node removed");
    Ok(node)
  }

  pub async fn set_payload(&self, loom: &str, node_id: &str, payload: Value) -> Result<(), IndexError> {
    self.mutate(loom, |l| l.set_payload(node_id, payload)).await
  }

  /// Weave a loom and append the result to its history.
  #[instrument(name = "index_weave", skip(self, initial_inputs, cancel))]
  pub async fn weave(
    &self,
    loom: &str,
    initial_inputs: Map<String, Value>,
    cancel: &CancellationToken,
  ) -> Result<WeaveResult, IndexError> {
    let slot = self.slot(loom)?;
    let mut working = slot.lock(self.options.lock_timeout).await?;

    let result = self.weaver.weave(&mut working, initial_inputs, cancel).await;

    slot.push_history(result.clone(), self.options.history_limit);
    slot.publish(&working);
    Ok(result)
  }

  /// The most recent `limit` weave results, oldest first.
  pub fn history(&self, loom: &str, limit: usize) -> Result<Vec<WeaveResult>, IndexError> {
    let history = self.slot(loom)?.history();
    let skip = history.len().saturating_sub(limit);
    Ok(history.into_iter().skip(skip).collect())
  }

  /// Score the loom's recent history. Never changes state.
  pub fn evaluate(&self, loom: &str, threshold: f64) -> Result<MoltDecision, IndexError> {
    let history = self.slot(loom)?.history();
    Ok(loom_molt::evaluate(&history, self.options.drift_window, threshold)?)
  }

  /// Molt on request, skipping evaluation.
  #[instrument(name = "molt_execute", skip(self, cancel))]
  pub async fn molt(&self, loom: &str, reason: &str, cancel: &CancellationToken) -> Result<MoltRecord, IndexError> {
    let slot = self.slot(loom)?;
    let phase = slot.phase.enter(MoltPhase::Molting)?;
    self.run_molt(&slot, phase, reason, None, cancel).await
  }

  /// Evaluate, and molt if the decision recommends it.
  #[instrument(name = "molt_auto", skip(self, cancel))]
  pub async fn molt_auto(&self, loom: &str, threshold: f64, cancel: &CancellationToken) -> Result<MoltOutcome, IndexError> {
    let slot = self.slot(loom)?;
    let phase = slot.phase.enter(MoltPhase::Evaluating)?;

    let decision = loom_molt::evaluate(&slot.history(), self.options.drift_window, threshold)?;
    info!(loom, score = decision.score, recommended = decision.recommended, "drift evaluated");
    if !decision.recommended {
      return Ok(MoltOutcome { decision, record: None });
    }

    phase.advance(MoltPhase::Molting);
    let reason = format!(
      "drift {:.3} reached threshold {:.3}",
      decision.score, decision.threshold
    );
    let record = self
      .run_molt(&slot, phase, &reason, Some(decision.clone()), cancel)
      .await?;

    Ok(MoltOutcome {
      decision,
      record: Some(record),
    })
  }

  /// Molt audit records, oldest first.
  pub fn audit(&self, loom: &str) -> Result<Vec<MoltRecord>, IndexError> {
    Ok(self.slot(loom)?.audit())
  }

  /// Rewind points kept for a loom, oldest first.
  pub fn molt_snapshots(&self, loom: &str) -> Result<Vec<MoltSnapshot>, IndexError> {
    Ok(self.slot(loom)?.snapshots())
  }

  /// Snapshot, reset every node to idle, re-weave and record the molt.
  ///
  /// The re-weave uses the initial inputs of the most recent successful
  /// weave, or none. `_phase` keeps the loom out of `Stable` until return.
  async fn run_molt(
    &self,
    slot: &LoomSlot,
    _phase: PhaseGuard,
    reason: &str,
    decision: Option<MoltDecision>,
    cancel: &CancellationToken,
  ) -> Result<MoltRecord, IndexError> {
    let mut working = slot.lock(self.options.lock_timeout).await?;

    let history = slot.history();
    let snapshot = MoltSnapshot::take(working.to_def(), history.len());
    let inputs = history
      .iter()
      .rev()
      .find(|r| r.status == WeaveStatus::Success)
      .map(|r| r.initial_inputs.clone())
      .unwrap_or_default();
    info!(loom = %slot.name, snapshot_id = %snapshot.snapshot_id, "molting");

    working.reset_statuses();
    let result = self.weaver.weave(&mut working, inputs, cancel).await;

    slot.push_history(result.clone(), self.options.history_limit);
    slot.publish(&working);

    let record = MoltRecord::new(reason, decision, &snapshot, result);
    slot.push_snapshot(snapshot, self.options.snapshot_limit);
    slot.push_audit(record.clone(), self.options.snapshot_limit);

    info!(
      loom = %slot.name,
      molt_id = %record.molt_id,
      status = ?record.after_weave.status,
      "molt finished"
    );
    Ok(record)
  }

  /// Run one graph mutation as the loom's writer and publish the result.
  ///
  /// Graph mutations validate before they change anything, so a failed
  /// mutation leaves the working copy untouched.
  async fn mutate<T>(
    &self,
    loom: &str,
    f: impl FnOnce(&mut Loom) -> Result<T, GraphError>,
  ) -> Result<T, IndexError> {
    let slot = self.slot(loom)?;
    let mut working = slot.lock(self.options.lock_timeout).await?;
    let out = f(&mut *working)?;
    slot.publish(&working);
    Ok(out)
  }

  fn slot(&self, name: &str) -> Result<Arc<LoomSlot>, IndexError> {
    self
      .looms
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .get(name)
      .cloned()
      .ok_or_else(|| IndexError::LoomNotFound {
        loom: name.to_string(),
      })
  }
}
