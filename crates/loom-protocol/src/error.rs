use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
  #[error("parse error: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("method not found: {0}")]
  MethodNotFound(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ProtocolError {
  /// JSON-RPC error code reported to the client.
  pub fn code(&self) -> i64 {
    match self {
      ProtocolError::Parse(_) => -32700,
      ProtocolError::InvalidRequest(_) => -32600,
      ProtocolError::MethodNotFound(_) => -32601,
      ProtocolError::Io(_) => -32603,
    }
  }
}
