use loom_config::{EdgeDef, YarnKind};
use serde::{Deserialize, Serialize};

/// Which acyclicity class a yarn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeClass {
  /// Data, signal and state yarns.
  Flow,
  Guard,
}

/// A directed yarn between two nodes. Identity is the whole tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
  pub source: String,
  pub target: String,
  pub kind: YarnKind,
}

impl Edge {
  pub fn new(source: impl Into<String>, target: impl Into<String>, kind: YarnKind) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      kind,
    }
  }

  pub fn class(&self) -> EdgeClass {
    EdgeClass::of(self.kind)
  }

  pub fn touches(&self, node_id: &str) -> bool {
    self.source == node_id || self.target == node_id
  }

  pub fn to_def(&self) -> EdgeDef {
    EdgeDef {
      source: self.source.clone(),
      target: self.target.clone(),
      kind: self.kind,
    }
  }
}

impl EdgeClass {
  pub fn of(kind: YarnKind) -> Self {
    if kind.is_guard() {
      EdgeClass::Guard
    } else {
      EdgeClass::Flow
    }
  }
}
