use loom_graph::GraphError;
use loom_index::IndexError;
use loom_molt::MoltError;
use thiserror::Error;

use crate::delegate::DelegateError;

/// Everything an invocation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
  /// Malformed or missing arguments, or an unrecognized kind.
  #[error("{0}")]
  Validation(String),

  /// Reference to a loom or node that does not exist.
  #[error("{0}")]
  NotFound(String),

  /// The mutation would close a cycle.
  #[error("{0}")]
  Cycle(String),

  /// Contention with another molt or writer; callers may retry.
  #[error("{0}")]
  Conflict(String),

  /// A delegate ran and failed.
  #[error("{0}")]
  Execution(String),

  /// A delegate could not be reached at all.
  #[error("delegate unreachable: {0}")]
  Unavailable(String),

  #[error("unknown capability: {0}")]
  UnknownCapability(String),
}

impl CapabilityError {
  /// Snake-case taxonomy name carried in error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      CapabilityError::Validation(_) => "validation_error",
      CapabilityError::NotFound(_) => "not_found_error",
      CapabilityError::Cycle(_) => "cycle_error",
      CapabilityError::Conflict(_) => "conflict_error",
      CapabilityError::Execution(_) => "execution_error",
      CapabilityError::Unavailable(_) => "unavailable_error",
      CapabilityError::UnknownCapability(_) => "unknown_capability_error",
    }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    CapabilityError::Validation(message.into())
  }
}

impl From<GraphError> for CapabilityError {
  fn from(e: GraphError) -> Self {
    let message = e.to_string();
    match e {
      GraphError::Validation(_) => CapabilityError::Validation(message),
      GraphError::NodeNotFound(_) => CapabilityError::NotFound(message),
      GraphError::DuplicateNode(_) => CapabilityError::Conflict(message),
      GraphError::Cycle { .. } => CapabilityError::Cycle(message),
    }
  }
}

impl From<IndexError> for CapabilityError {
  fn from(e: IndexError) -> Self {
    let message = e.to_string();
    match e {
      IndexError::LoomNotFound { .. } => CapabilityError::NotFound(message),
      IndexError::LoomExists { .. } | IndexError::LockTimeout { .. } => CapabilityError::Conflict(message),
      IndexError::InvalidName(_) => CapabilityError::Validation(message),
      IndexError::Graph(e) => e.into(),
      IndexError::Molt(MoltError::InvalidThreshold { .. }) => CapabilityError::Validation(message),
      IndexError::Molt(MoltError::Busy { .. }) => CapabilityError::Conflict(message),
    }
  }
}

impl From<DelegateError> for CapabilityError {
  fn from(e: DelegateError) -> Self {
    match e {
      DelegateError::Unavailable(message) => CapabilityError::Unavailable(message),
      DelegateError::Failed(message) => CapabilityError::Execution(message),
    }
  }
}
