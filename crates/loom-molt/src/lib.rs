//! Loom Molt
//!
//! Decides when a loom has drifted far enough from health to warrant a
//! reset-and-re-weave, and guards the per-loom phase machine that keeps
//! molts from interleaving.
//!
//! ```text
//!   Stable ──evaluate──▶ Evaluating ──recommended──▶ Molting ──▶ Stable
//!     │                      │                                    ▲
//!     │                      └──────────not recommended───────────┤
//!     └────────────────────execute(reason)──▶ Molting ────────────┘
//! ```

mod audit;
mod drift;
mod error;
mod phase;

pub use audit::{MoltRecord, MoltSnapshot};
pub use drift::{DEFAULT_DRIFT_THRESHOLD, MoltDecision, degraded_nodes, drift_score, evaluate};
pub use error::MoltError;
pub use phase::{MoltPhase, PhaseCell, PhaseGuard};
