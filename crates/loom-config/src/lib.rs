//! Loom Config
//!
//! This crate contains the serializable configuration types for the loom
//! workshop. These types describe looms before they are loaded into the
//! in-memory index, and the settings the index is constructed with.
//!
//! Configuration can be loaded from:
//! - JSON settings files (`<data_dir>/config.json`, or `--config`)
//! - JSON loom definitions (preloaded with `--loom`, or `loom.import`)
//!
//! The index takes these types, validates them against the graph invariants
//! and turns them into live looms.

mod enums;
mod error;
mod loom;
mod node;
mod settings;

pub use enums::{UnknownKind, YarnKind};
pub use error::ConfigError;
pub use loom::{EdgeDef, LoomDef};
pub use node::{NodeDef, NodeKind, Position};
pub use settings::Settings;
