//! Capability descriptors and argument validation.

use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::CapabilityError;

/// JSON type of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
  String,
  Number,
  Integer,
  Boolean,
  Object,
  Array,
}

impl ParamType {
  fn accepts(self, value: &Value) -> bool {
    match self {
      ParamType::String => value.is_string(),
      ParamType::Number => value.is_number(),
      ParamType::Integer => value.is_u64() || value.is_i64(),
      ParamType::Boolean => value.is_boolean(),
      ParamType::Object => value.is_object(),
      ParamType::Array => value.is_array(),
    }
  }
}

impl fmt::Display for ParamType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ParamType::String => "string",
      ParamType::Number => "number",
      ParamType::Integer => "integer",
      ParamType::Boolean => "boolean",
      ParamType::Object => "object",
      ParamType::Array => "array",
    };
    f.write_str(name)
  }
}

/// One parameter of an input schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
  #[serde(skip)]
  pub name: &'static str,
  #[serde(rename = "type")]
  pub kind: ParamType,
  pub description: &'static str,
  #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
  pub allowed: Option<Vec<&'static str>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
  #[serde(skip)]
  pub required: bool,
}

impl Param {
  pub fn new(name: &'static str, kind: ParamType, description: &'static str) -> Self {
    Self {
      name,
      kind,
      description,
      allowed: None,
      default: None,
      required: false,
    }
  }

  pub fn string(name: &'static str, description: &'static str) -> Self {
    Self::new(name, ParamType::String, description)
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub fn one_of(mut self, allowed: &[&'static str]) -> Self {
    self.allowed = Some(allowed.to_vec());
    self
  }

  pub fn default(mut self, value: Value) -> Self {
    self.default = Some(value);
    self
  }
}

/// Object schema for a capability's arguments.
///
/// Serializes as `{type: "object", properties, required}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
  params: Vec<Param>,
}

impl InputSchema {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn param(mut self, param: Param) -> Self {
    self.params.push(param);
    self
  }

  pub fn params(&self) -> &[Param] {
    &self.params
  }

  /// Check `args` against the schema and fill in defaults.
  ///
  /// `null` counts as an empty object. A `null` parameter counts as
  /// absent. Parameters the schema does not name are dropped.
  pub fn validate(&self, args: Value) -> Result<Args, CapabilityError> {
    let mut given = match args {
      Value::Null => Map::new(),
      Value::Object(map) => map,
      other => {
        return Err(CapabilityError::validation(format!(
          "arguments must be an object, got {}",
          json_type(&other)
        )));
      }
    };

    let mut checked = Map::new();
    for param in &self.params {
      match given.remove(param.name).filter(|v| !v.is_null()) {
        Some(value) => {
          if !param.kind.accepts(&value) {
            return Err(CapabilityError::validation(format!(
              "parameter '{}' must be {}, got {}",
              param.name,
              param.kind,
              json_type(&value)
            )));
          }
          if let Some(allowed) = &param.allowed
            && !value.as_str().is_some_and(|s| allowed.contains(&s))
          {
            return Err(CapabilityError::validation(format!(
              "parameter '{}' must be one of [{}], got {}",
              param.name,
              allowed.join(", "),
              value
            )));
          }
          checked.insert(param.name.to_string(), value);
        }
        None if param.required => {
          return Err(CapabilityError::validation(format!(
            "missing required parameter '{}'",
            param.name
          )));
        }
        None => {
          if let Some(default) = &param.default {
            checked.insert(param.name.to_string(), default.clone());
          }
        }
      }
    }

    Ok(Args(checked))
  }
}

impl Serialize for InputSchema {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let properties: Map<String, Value> = self
      .params
      .iter()
      .map(|p| {
        let property = serde_json::to_value(p).map_err(<S::Error as serde::ser::Error>::custom)?;
        Ok((p.name.to_string(), property))
      })
      .collect::<Result<_, S::Error>>()?;
    let required: Vec<&str> = self
      .params
      .iter()
      .filter(|p| p.required)
      .map(|p| p.name)
      .collect();

    let mut map = serializer.serialize_map(Some(3))?;
    map.serialize_entry("type", "object")?;
    map.serialize_entry("properties", &properties)?;
    map.serialize_entry("required", &required)?;
    map.end()
  }
}

/// Static description of one capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityDescriptor {
  /// Namespaced `area.operation`.
  pub name: &'static str,
  pub description: &'static str,
  #[serde(rename = "inputSchema")]
  pub input_schema: InputSchema,
}

/// Arguments that passed validation, defaults applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
  pub fn get(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }

  pub fn take(&mut self, name: &str) -> Option<Value> {
    self.0.remove(name)
  }

  pub fn opt_str(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(Value::as_str)
  }

  pub fn str(&self, name: &str) -> Result<&str, CapabilityError> {
    self.opt_str(name).ok_or_else(|| missing(name))
  }

  pub fn f64(&self, name: &str) -> Result<f64, CapabilityError> {
    self.get(name).and_then(Value::as_f64).ok_or_else(|| missing(name))
  }

  pub fn usize(&self, name: &str) -> Result<usize, CapabilityError> {
    let value = self.get(name).ok_or_else(|| missing(name))?;
    value
      .as_u64()
      .map(|n| n as usize)
      .ok_or_else(|| CapabilityError::validation(format!("parameter '{name}' must be a non-negative integer")))
  }

  /// An object parameter, or an empty map when absent.
  pub fn object(&mut self, name: &str) -> Map<String, Value> {
    match self.take(name) {
      Some(Value::Object(map)) => map,
      _ => Map::new(),
    }
  }

  /// An array-of-strings parameter, or empty when absent.
  pub fn strings(&self, name: &str) -> Result<Vec<String>, CapabilityError> {
    let Some(items) = self.get(name).and_then(Value::as_array) else {
      return Ok(Vec::new());
    };
    items
      .iter()
      .map(|item| {
        item
          .as_str()
          .map(str::to_string)
          .ok_or_else(|| CapabilityError::validation(format!("parameter '{name}' must contain only strings")))
      })
      .collect()
  }
}

fn missing(name: &str) -> CapabilityError {
  CapabilityError::validation(format!("missing required parameter '{name}'"))
}

fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
