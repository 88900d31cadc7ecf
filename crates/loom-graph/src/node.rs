use std::fmt;

use loom_config::{NodeDef, NodeKind, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime status of a node, as left by the last weave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  #[default]
  Idle,
  Running,
  Done,
  Error,
}

impl fmt::Display for NodeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      NodeStatus::Idle => "idle",
      NodeStatus::Running => "running",
      NodeStatus::Done => "done",
      NodeStatus::Error => "error",
    };
    f.write_str(s)
  }
}

/// A computation unit in a loom.
///
/// Ports are implicit: a node's inputs are its incoming yarns and its
/// outputs are its outgoing yarns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub node_id: String,
  pub name: String,
  #[serde(flatten)]
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
  #[serde(default)]
  pub status: NodeStatus,
  /// Output of the last weave that ran this node.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_output: Option<Value>,
}

impl Node {
  /// Create an idle node with a fresh id.
  pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
    Self {
      node_id: uuid::Uuid::new_v4().to_string(),
      name: name.into(),
      kind,
      position: None,
      status: NodeStatus::Idle,
      last_output: None,
    }
  }

  pub fn with_id(mut self, node_id: impl Into<String>) -> Self {
    self.node_id = node_id.into();
    self
  }

  pub fn with_position(mut self, position: Option<Position>) -> Self {
    self.position = position;
    self
  }

  /// Forget everything the last weave left on this node.
  pub fn reset(&mut self) {
    self.status = NodeStatus::Idle;
    self.last_output = None;
  }

  pub fn to_def(&self) -> NodeDef {
    NodeDef {
      node_id: self.node_id.clone(),
      name: self.name.clone(),
      kind: self.kind.clone(),
      position: self.position,
    }
  }
}

impl From<NodeDef> for Node {
  fn from(def: NodeDef) -> Self {
    Self {
      node_id: def.node_id,
      name: def.name,
      kind: def.kind,
      position: def.position,
      status: NodeStatus::Idle,
      last_output: None,
    }
  }
}
