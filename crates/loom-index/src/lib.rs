//! Loom Index
//!
//! The only long-lived mutable state: every loom by name, with its weave
//! history, molt snapshots and audit trail.
//!
//! Each loom has a single writer lock. Mutations, weaves and molts on one
//! loom queue behind each other (up to a timeout) while looms are
//! independent of one another. Readers never take the writer lock; they see
//! the snapshot published after the last completed write.

mod error;
mod index;
mod slot;

pub use error::IndexError;
pub use index::{IndexOptions, LoomIndex, LoomSummary, MoltOutcome};
