use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::YarnKind;
use crate::error::ConfigError;
use crate::node::NodeDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub source: String,
  pub target: String,
  #[serde(default)]
  pub kind: YarnKind,
}

/// A loom definition: a named set of nodes and the yarns between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoomDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
}

impl LoomDef {
  /// An empty definition.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: None,
      nodes: Vec::new(),
      edges: Vec::new(),
    }
  }

  /// Read a definition from a JSON file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}
