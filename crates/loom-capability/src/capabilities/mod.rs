//! Built-in capabilities, one module per area.

use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, Param};

pub(crate) mod canvas;
pub(crate) mod delegates;
pub(crate) mod loom;
pub(crate) mod molt;

fn to_json<T: Serialize>(value: &T) -> Result<Value, CapabilityError> {
  serde_json::to_value(value).map_err(|e| CapabilityError::Execution(format!("failed to encode result: {e}")))
}

fn loom_name_param() -> Param {
  Param::string("loom_name", "Name of the loom").required()
}

/// Optional loom name; canvas operations fall back to the default loom.
fn target_loom_param() -> Param {
  Param::string("loom_name", "Loom to edit; the default loom when omitted")
}

fn target_loom<'a>(services: &'a Services, args: &'a Args) -> &'a str {
  args.opt_str("loom_name").unwrap_or(&services.default_loom)
}
