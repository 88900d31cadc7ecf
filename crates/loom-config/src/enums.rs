use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a kind name is not one of the recognized names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown kind '{0}'")]
pub struct UnknownKind(pub String);

/// The kind of a yarn (edge) between two nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YarnKind {
  /// Carries the source's output into the target's input.
  #[default]
  Data,
  Signal,
  State,
  /// Gates whether the target may run. Carries no data.
  Guard,
}

impl YarnKind {
  pub const NAMES: [&'static str; 4] = ["data", "signal", "state", "guard"];

  pub fn as_str(&self) -> &'static str {
    match self {
      YarnKind::Data => "data",
      YarnKind::Signal => "signal",
      YarnKind::State => "state",
      YarnKind::Guard => "guard",
    }
  }

  pub fn is_guard(&self) -> bool {
    matches!(self, YarnKind::Guard)
  }
}

impl fmt::Display for YarnKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for YarnKind {
  type Err = UnknownKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "data" => Ok(YarnKind::Data),
      "signal" => Ok(YarnKind::Signal),
      "state" => Ok(YarnKind::State),
      "guard" => Ok(YarnKind::Guard),
      other => Err(UnknownKind(other.to_string())),
    }
  }
}
