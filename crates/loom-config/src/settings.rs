use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings the loom index is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Loom created at startup and used by canvas operations that name none.
  pub default_loom: String,
  /// Weave results kept per loom; the oldest are dropped first.
  pub history_limit: usize,
  /// Molt rewind snapshots kept per loom.
  pub snapshot_limit: usize,
  /// How long a writer waits for a busy loom before giving up.
  pub lock_timeout_ms: u64,
  /// Number of recent weaves the drift score looks at.
  pub drift_window: usize,
  /// Loom definition files loaded at startup.
  pub looms: Vec<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      default_loom: "main".to_string(),
      history_limit: 100,
      snapshot_limit: 16,
      lock_timeout_ms: 5_000,
      drift_window: 5,
      looms: Vec::new(),
    }
  }
}

impl Settings {
  /// Load settings from a JSON file. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => {
        return Err(ConfigError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}
