//! Loom Protocol
//!
//! Exposes the capability dispatcher to third-party clients as one JSON
//! object per line in each direction.
//!
//! Requests:
//! - `{"id": 1, "method": "tools/list"}`
//! - `{"id": 2, "method": "tools/call", "params": {"name": "loom.weave", "arguments": {...}}}`
//!
//! Responses carry the request id and either a `result` (the descriptor list,
//! or the capability envelope) or an `error` with a JSON-RPC style code for
//! frames that could not be understood. Capability failures are not protocol
//! errors: they arrive as envelopes with `status: "error"`.
//!
//! Requests on one stream run concurrently, so responses can come back in a
//! different order than the requests were sent.

mod error;
mod message;
mod server;

pub use error::ProtocolError;
pub use message::{CallParams, Request, Response, ResponseError};
pub use server::{handle_line, serve};
