use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
  Ok,
  Error,
}

/// Serialized form of a [`CapabilityError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub kind: String,
  pub message: String,
  /// The work could not even be attempted.
  pub delegate_unreachable: bool,
}

impl From<&CapabilityError> for ErrorBody {
  fn from(e: &CapabilityError) -> Self {
    Self {
      kind: e.kind().to_string(),
      message: e.to_string(),
      delegate_unreachable: matches!(e, CapabilityError::Unavailable(_)),
    }
  }
}

/// The uniform result of every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub capability: String,
  pub status: EnvelopeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorBody>,
}

impl Envelope {
  pub fn ok(capability: impl Into<String>, result: Value) -> Self {
    Self {
      capability: capability.into(),
      status: EnvelopeStatus::Ok,
      result: Some(result),
      error: None,
    }
  }

  pub fn error(capability: impl Into<String>, error: &CapabilityError) -> Self {
    Self {
      capability: capability.into(),
      status: EnvelopeStatus::Error,
      result: None,
      error: Some(error.into()),
    }
  }

  pub fn from_result(capability: impl Into<String>, result: Result<Value, CapabilityError>) -> Self {
    match result {
      Ok(value) => Self::ok(capability, value),
      Err(e) => Self::error(capability, &e),
    }
  }

  pub fn is_ok(&self) -> bool {
    self.status == EnvelopeStatus::Ok
  }

  /// Taxonomy name of the error, if any.
  pub fn error_kind(&self) -> Option<&str> {
    self.error.as_ref().map(|e| e.kind.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_ok_envelope_shape() {
    let envelope = Envelope::ok("loom.list", json!([]));
    assert_eq!(
      serde_json::to_value(&envelope).unwrap(),
      json!({ "capability": "loom.list", "status": "ok", "result": [] })
    );
  }

  #[test]
  fn test_unavailable_is_marked() {
    let envelope = Envelope::error("agent.chat", &CapabilityError::Unavailable("agent offline".into()));
    let body = envelope.error.unwrap();
    assert_eq!(body.kind, "unavailable_error");
    assert!(body.delegate_unreachable);
    assert_eq!(body.message, "delegate unreachable: agent offline");

    let envelope = Envelope::error("skill.execute", &CapabilityError::Execution("boom".into()));
    assert!(!envelope.error.unwrap().delegate_unreachable);
  }
}
