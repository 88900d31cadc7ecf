use crate::phase::MoltPhase;

/// Errors raised by the drift evaluator and phase machine.
#[derive(Debug, thiserror::Error)]
pub enum MoltError {
  /// Drift threshold outside `[0, 1]`.
  #[error("drift threshold must be within [0, 1], got {threshold}")]
  InvalidThreshold { threshold: f64 },

  /// Another evaluation or molt holds the loom.
  #[error("loom '{loom}' is {phase}, refusing to molt concurrently")]
  Busy { loom: String, phase: MoltPhase },
}
