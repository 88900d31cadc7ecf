//! Loom Capability
//!
//! Every externally invokable operation, described once with a typed input
//! schema and routed through a single [`Dispatcher`]. The editor, the agent
//! and protocol clients all call through here; nothing else mutates a loom.
//!
//! ```text
//!   invoke(name, args)
//!        │
//!        ▼
//!   ┌──────────┐   unknown name   ┌──────────────────────────┐
//!   │ Catalog  │ ───────────────▶ │ error: unknown_capability│
//!   └────┬─────┘                  └──────────────────────────┘
//!        │ InputSchema::validate (defaults applied, fail fast)
//!        ▼
//!   ┌──────────┐
//!   │ handler  │ ──▶ LoomIndex / Agent / MemoryStore / SkillProvider
//!   └────┬─────┘
//!        ▼
//!   Envelope { capability, status, result | error }
//! ```

mod action;
mod capabilities;
mod catalog;
mod delegate;
mod dispatcher;
mod envelope;
mod error;
mod memory;
mod schema;

pub use action::SkillActionHandler;
pub use catalog::{Capability, Catalog, Handler};
pub use delegate::{Agent, DelegateError, MemoryEntry, MemoryStore, Offline, SkillInfo, SkillProvider};
pub use dispatcher::{Dispatcher, Services};
pub use envelope::{Envelope, EnvelopeStatus, ErrorBody};
pub use error::CapabilityError;
pub use memory::InMemoryMemory;
pub use schema::{Args, CapabilityDescriptor, InputSchema, Param, ParamType};
