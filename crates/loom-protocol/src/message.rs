use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// One request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Request {
  #[serde(rename = "tools/list")]
  ListTools,

  #[serde(rename = "tools/call")]
  CallTool { params: CallParams },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
  pub name: String,
  #[serde(default)]
  pub arguments: Value,
}

impl Request {
  pub const METHODS: [&'static str; 2] = ["tools/list", "tools/call"];

  /// Split a frame into its id and request.
  ///
  /// The id is recovered even when the rest of the frame is invalid, so the
  /// error response can still be correlated.
  pub fn parse(line: &str) -> (Value, Result<Request, ProtocolError>) {
    let frame: Value = match serde_json::from_str(line) {
      Ok(frame) => frame,
      Err(e) => return (Value::Null, Err(ProtocolError::Parse(e))),
    };
    let Value::Object(mut fields) = frame else {
      return (
        Value::Null,
        Err(ProtocolError::InvalidRequest("frame must be a JSON object".to_string())),
      );
    };

    let id = fields.remove("id").unwrap_or(Value::Null);
    let request = match fields.get("method").and_then(Value::as_str) {
      None => Err(ProtocolError::InvalidRequest("missing method".to_string())),
      Some(method) if !Self::METHODS.contains(&method) => Err(ProtocolError::MethodNotFound(method.to_string())),
      Some(_) => serde_json::from_value(Value::Object(fields))
        .map_err(|e| ProtocolError::InvalidRequest(e.to_string())),
    };

    (id, request)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
  pub code: i64,
  pub message: String,
}

/// One response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub id: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ResponseError>,
}

impl Response {
  pub fn result(id: Value, result: Value) -> Self {
    Self {
      id,
      result: Some(result),
      error: None,
    }
  }

  pub fn error(id: Value, error: &ProtocolError) -> Self {
    Self {
      id,
      result: None,
      error: Some(ResponseError {
        code: error.code(),
        message: error.to_string(),
      }),
    }
  }
}
