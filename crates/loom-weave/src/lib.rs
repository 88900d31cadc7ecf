//! Loom Weave
//!
//! This crate provides the topological executor. A weave visits every node
//! of a loom once, in a deterministic dependency order, and hands each node
//! to the [`NodeHandler`] registered for its kind.
//!
//! ```text
//! Loom ──execution_order()──► [n1, n2, ...]
//!                                 │
//!        for each node:           ▼
//!          cancelled?          → skipped
//!          no done upstream?   → skipped
//!          guard closed?       → skipped (node left idle)
//!          otherwise           → HandlerSet[kind].execute(node, input)
//!                                 │
//!                                 ▼
//!                   WeaveResult { outcomes, status }
//! ```
//!
//! A failing node never aborts the weave; it is recorded as `error` and the
//! nodes that depend only on it are skipped.

mod error;
mod events;
mod handler;
mod result;
mod weaver;

pub use error::HandlerError;
pub use events::{ChannelNotifier, ExecutionNotifier, NoopNotifier, WeaveEvent};
pub use handler::{GateHandler, HandlerSet, NodeHandler, NodeInput, PassthroughHandler, gate_allows};
pub use result::{NodeFailure, NodeOutcome, SkipReason, TerminalStatus, WeaveResult, WeaveStatus};
pub use weaver::Weaver;
