//! Weave events and notifiers for observability.
//!
//! Events are emitted while a weave runs so consumers can observe progress,
//! stream it to an editor, or record it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::{SkipReason, WeaveStatus};

/// Events emitted during a weave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeaveEvent {
  /// A weave has started.
  WeaveStarted { weave_id: String, loom: String },

  /// A node handler was invoked.
  NodeStarted { weave_id: String, node_id: String },

  /// A node completed successfully.
  NodeCompleted {
    weave_id: String,
    node_id: String,
    output: serde_json::Value,
  },

  /// A node handler failed.
  NodeFailed {
    weave_id: String,
    node_id: String,
    error: String,
  },

  /// A node was not run.
  NodeSkipped {
    weave_id: String,
    node_id: String,
    reason: SkipReason,
  },

  /// A weave has finished, whatever its outcome.
  WeaveFinished { weave_id: String, status: WeaveStatus },
}

/// Trait for receiving weave events.
///
/// The weaver calls `notify` for each event; implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: WeaveEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: WeaveEvent) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a weave; volume is a handful
  // of events per node.
  sender: mpsc::UnboundedSender<WeaveEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<WeaveEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: WeaveEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
