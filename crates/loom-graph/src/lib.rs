//! Loom Graph
//!
//! This crate provides the in-memory graph model for looms: nodes, the typed
//! yarns between them, and the structural invariants every mutation keeps.
//!
//! Invariants:
//! - Every yarn references two nodes of the same loom
//! - Data, signal and state yarns form a DAG; guard yarns form their own DAG
//! - A yarn is identified by its (source, target, kind) tuple; duplicates are no-ops
//! - Removing a node removes every yarn touching it
//!
//! Cycles are rejected when a yarn is connected, so execution never has to
//! handle them.

mod edge;
mod error;
mod graph;
mod loom;
mod node;

pub use edge::{Edge, EdgeClass};
pub use error::GraphError;
pub use graph::Graph;
pub use loom::{Loom, Topology};
pub use loom_config::{NodeKind, Position, YarnKind};
pub use node::{Node, NodeStatus};
