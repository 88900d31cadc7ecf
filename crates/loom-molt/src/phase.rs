//! The per-loom molt phase machine.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::MoltError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoltPhase {
  #[default]
  Stable,
  Evaluating,
  Molting,
}

impl fmt::Display for MoltPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MoltPhase::Stable => write!(f, "stable"),
      MoltPhase::Evaluating => write!(f, "evaluating"),
      MoltPhase::Molting => write!(f, "molting"),
    }
  }
}

/// Shared phase of one loom.
///
/// Leaving `Stable` hands out a [`PhaseGuard`]; the phase returns to
/// `Stable` when the guard drops, whatever happened in between.
#[derive(Debug, Clone)]
pub struct PhaseCell {
  loom: String,
  phase: Arc<Mutex<MoltPhase>>,
}

impl PhaseCell {
  pub fn new(loom: impl Into<String>) -> Self {
    Self {
      loom: loom.into(),
      phase: Arc::new(Mutex::new(MoltPhase::Stable)),
    }
  }

  pub fn current(&self) -> MoltPhase {
    *self.lock()
  }

  /// Move from `Stable` to `phase`, or fail without waiting.
  pub fn enter(&self, phase: MoltPhase) -> Result<PhaseGuard, MoltError> {
    let mut current = self.lock();
    if *current != MoltPhase::Stable {
      return Err(MoltError::Busy {
        loom: self.loom.clone(),
        phase: *current,
      });
    }
    *current = phase;
    tracing::debug!(loom = %self.loom, phase = %phase, "molt phase entered");

    Ok(PhaseGuard { cell: self.clone() })
  }

  fn lock(&self) -> MutexGuard<'_, MoltPhase> {
    // The phase is a plain value; a panic elsewhere cannot leave it torn.
    self.phase.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// Holds a loom out of `Stable` until dropped.
#[derive(Debug)]
pub struct PhaseGuard {
  cell: PhaseCell,
}

impl PhaseGuard {
  pub fn phase(&self) -> MoltPhase {
    self.cell.current()
  }

  /// Move to another non-stable phase, e.g. `Evaluating` to `Molting`.
  pub fn advance(&self, phase: MoltPhase) {
    *self.cell.lock() = phase;
    tracing::debug!(loom = %self.cell.loom, phase = %phase, "molt phase advanced");
  }
}

impl Drop for PhaseGuard {
  fn drop(&mut self) {
    *self.cell.lock() = MoltPhase::Stable;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_enter_and_release() {
    let cell = PhaseCell::new("main");
    {
      let guard = cell.enter(MoltPhase::Evaluating).unwrap();
      assert_eq!(cell.current(), MoltPhase::Evaluating);
      guard.advance(MoltPhase::Molting);
      assert_eq!(guard.phase(), MoltPhase::Molting);
    }
    assert_eq!(cell.current(), MoltPhase::Stable);
  }

  #[test]
  fn test_second_entry_is_refused() {
    let cell = PhaseCell::new("main");
    let _guard = cell.enter(MoltPhase::Molting).unwrap();

    let err = cell.clone().enter(MoltPhase::Molting).unwrap_err();
    assert!(matches!(
      err,
      MoltError::Busy {
        phase: MoltPhase::Molting,
        ..
      }
    ));
    assert!(cell.enter(MoltPhase::Evaluating).is_err());
  }
}
