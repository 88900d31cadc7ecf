use thiserror::Error;

/// Failure reported by a node handler.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
  /// The handler ran and the work failed.
  #[error("{0}")]
  Failed(String),

  /// The handler could not reach whatever does the work.
  #[error("delegate unreachable: {0}")]
  Unavailable(String),
}

impl HandlerError {
  pub fn failed(message: impl Into<String>) -> Self {
    HandlerError::Failed(message.into())
  }

  pub fn unavailable(message: impl Into<String>) -> Self {
    HandlerError::Unavailable(message.into())
  }
}
