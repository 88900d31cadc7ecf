//! Drift scoring over weave history.

use std::collections::BTreeSet;

use loom_weave::{TerminalStatus, WeaveResult};
use serde::{Deserialize, Serialize};

use crate::error::MoltError;

pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.5;

/// Outcome of one drift evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoltDecision {
  pub recommended: bool,
  pub score: f64,
  pub threshold: f64,
  /// How many of the most recent weaves fed the score.
  pub weaves_considered: usize,
  /// Nodes whose latest terminal status was `error` or `skipped`.
  pub degraded_nodes: Vec<String>,
}

/// Score the tail of a loom's history and compare it to `threshold`.
///
/// `history` is oldest first. At most `window` of the most recent results
/// are considered, and always at least one.
pub fn evaluate(history: &[WeaveResult], window: usize, threshold: f64) -> Result<MoltDecision, MoltError> {
  if !(0.0..=1.0).contains(&threshold) {
    return Err(MoltError::InvalidThreshold { threshold });
  }

  let recent = tail(history, window);
  let score = drift_score(history, window);

  Ok(MoltDecision {
    recommended: score >= threshold,
    score,
    threshold,
    weaves_considered: recent.len(),
    degraded_nodes: degraded_nodes(history),
  })
}

/// Recency-weighted mean failure fraction over the last `window` weaves.
///
/// The i-th oldest weave in the window weighs i, so a failure never counts
/// for less than an older one. An empty history scores 0.
pub fn drift_score(history: &[WeaveResult], window: usize) -> f64 {
  let recent = tail(history, window);
  if recent.is_empty() {
    return 0.0;
  }

  let (weighted, total) = recent
    .iter()
    .enumerate()
    .fold((0.0, 0.0), |(weighted, total), (i, result)| {
      let weight = (i + 1) as f64;
      (weighted + weight * result.failure_fraction(), total + weight)
    });

  weighted / total
}

/// Nodes that did not reach `done` in the latest weave, sorted.
pub fn degraded_nodes(history: &[WeaveResult]) -> Vec<String> {
  let Some(latest) = history.last() else {
    return Vec::new();
  };

  latest
    .outcomes
    .iter()
    .filter(|o| o.status != TerminalStatus::Done)
    .map(|o| o.node_id.clone())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

fn tail(history: &[WeaveResult], window: usize) -> &[WeaveResult] {
  &history[history.len().saturating_sub(window.max(1))..]
}
