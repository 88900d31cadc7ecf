use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::UnknownKind;

/// Canvas position of a node. Only the editor surface reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// What a node does, with its kind-specific payload.
///
/// The payload is opaque to the core; it is handed to the handler
/// registered for the kind when the node is woven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
  /// Data ingress (mail fetch, API read, file read, webhook).
  Source {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
  },
  /// Data transformation (model call, filter, map, reduce).
  Transform {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
  },
  /// Side effect (send mail, open an issue, write a file).
  Action {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
  },
  /// Approval gate. Its output decides whether guarded targets run.
  Guard {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
  },
  /// Flow control (branching, fan-in, scheduling hints).
  Control {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
  },
}

impl NodeKind {
  pub const NAMES: [&'static str; 5] = ["source", "transform", "action", "guard", "control"];

  /// Build a kind from its name and payload.
  pub fn from_name(name: &str, payload: Value) -> Result<Self, UnknownKind> {
    match name {
      "source" => Ok(NodeKind::Source { payload }),
      "transform" => Ok(NodeKind::Transform { payload }),
      "action" => Ok(NodeKind::Action { payload }),
      "guard" => Ok(NodeKind::Guard { payload }),
      "control" => Ok(NodeKind::Control { payload }),
      other => Err(UnknownKind(other.to_string())),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      NodeKind::Source { .. } => "source",
      NodeKind::Transform { .. } => "transform",
      NodeKind::Action { .. } => "action",
      NodeKind::Guard { .. } => "guard",
      NodeKind::Control { .. } => "control",
    }
  }

  pub fn payload(&self) -> &Value {
    match self {
      NodeKind::Source { payload }
      | NodeKind::Transform { payload }
      | NodeKind::Action { payload }
      | NodeKind::Guard { payload }
      | NodeKind::Control { payload } => payload,
    }
  }

  /// Replace the payload, keeping the kind.
  pub fn with_payload(&self, payload: Value) -> Self {
    match self {
      NodeKind::Source { .. } => NodeKind::Source { payload },
      NodeKind::Transform { .. } => NodeKind::Transform { payload },
      NodeKind::Action { .. } => NodeKind::Action { payload },
      NodeKind::Guard { .. } => NodeKind::Guard { payload },
      NodeKind::Control { .. } => NodeKind::Control { payload },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub node_id: String,
  pub name: String,
  #[serde(flatten)]
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_node_def_flattens_kind() {
    let def: NodeDef = serde_json::from_value(json!({
      "node_id": "n1",
      "name": "fetch inbox",
      "type": "source",
      "payload": { "tool": "GMAIL_FETCH_EMAILS" }
    }))
    .unwrap();

    assert_eq!(def.kind.name(), "source");
    assert_eq!(def.kind.payload()["tool"], "GMAIL_FETCH_EMAILS");
    assert!(def.position.is_none());
  }

  #[test]
  fn test_unknown_kind_is_rejected() {
    let err = NodeKind::from_name("bogus", Value::Null).unwrap_err();
    assert_eq!(err.to_string(), "unknown kind 'bogus'");
  }

  #[test]
  fn test_with_payload_keeps_kind() {
    let kind = NodeKind::from_name("guard", Value::Null).unwrap();
    let updated = kind.with_payload(json!({ "allow": false }));
    assert_eq!(updated.name(), "guard");
    assert_eq!(updated.payload()["allow"], false);
  }
}
