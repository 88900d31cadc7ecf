use loom_config::YarnKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("{kind} yarn {from} -> {to} would create a cycle")]
  Cycle {
    from: String,
    to: String,
    kind: YarnKind,
  },
}
