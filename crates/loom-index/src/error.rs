use loom_graph::GraphError;
use loom_molt::MoltError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("loom not found: {loom}")]
  LoomNotFound { loom: String },

  #[error("loom already exists: {loom}")]
  LoomExists { loom: String },

  #[error("invalid loom name: {0:?}")]
  InvalidName(String),

  /// The writer lock stayed busy for the whole timeout.
  #[error("loom '{loom}' is busy; gave up after {timeout_ms}ms")]
  LockTimeout { loom: String, timeout_ms: u64 },

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Molt(#[from] MoltError),
}
