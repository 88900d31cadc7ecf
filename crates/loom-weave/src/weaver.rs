//! The topological executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use loom_graph::{EdgeClass, Graph, Loom, Node, NodeStatus};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::HandlerError;
use crate::events::{ExecutionNotifier, NoopNotifier, WeaveEvent};
use crate::handler::{HandlerSet, NodeInput, gate_allows};
use crate::result::{NodeFailure, NodeOutcome, SkipReason, TerminalStatus, WeaveResult, WeaveStatus};

/// Terminal status and output of the nodes visited so far in one weave.
type Visited = HashMap<String, (TerminalStatus, Option<Value>)>;

/// Runs looms in topological order.
///
/// Nodes run one at a time, so completion order equals the execution order
/// and two weaves of the same loom with the same payloads complete their
/// nodes in the same order.
pub struct Weaver {
  handlers: HandlerSet,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl Weaver {
  /// Create a weaver that discards events.
  pub fn new(handlers: HandlerSet) -> Self {
    Self::with_notifier(handlers, Arc::new(NoopNotifier))
  }

  pub fn with_notifier(handlers: HandlerSet, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    Self { handlers, notifier }
  }

  pub fn handlers(&self) -> &HandlerSet {
    &self.handlers
  }

  /// Weave a loom.
  ///
  /// Node statuses and last outputs are written back into `loom`. The
  /// weave itself never fails: node failures, skips and cancellation are
  /// all reported in the returned result.
  ///
  /// Cancellation is checked between nodes; a node that has started is
  /// allowed to finish.
  #[instrument(
    name = "weave",
    skip(self, loom, initial_inputs, cancel),
    fields(loom = %loom.name)
  )]
  pub async fn weave(
    &self,
    loom: &mut Loom,
    initial_inputs: Map<String, Value>,
    cancel: &CancellationToken,
  ) -> WeaveResult {
    let weave_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();

    info!(weave_id = %weave_id, nodes = loom.node_count(), "weave_started");
    self.notifier.notify(WeaveEvent::WeaveStarted {
      weave_id: weave_id.clone(),
      loom: loom.name.clone(),
    });

    let order = loom.execution_order();
    let flow = loom.graph(EdgeClass::Flow);
    let mut visited: Visited = HashMap::new();
    let mut outcomes = Vec::with_capacity(order.len());
    let mut cancelled = false;

    for node_id in &order {
      let Some(node) = loom.get_node(node_id).cloned() else {
        continue;
      };

      if !cancelled && cancel.is_cancelled() {
        warn!(weave_id = %weave_id, at_node = %node_id, "weave cancelled");
        cancelled = true;
      }

      let outcome = if cancelled {
        self.skip(loom, &weave_id, &node, SkipReason::Cancelled)
      } else {
        match prepare_input(loom, &flow, &visited, &node, &initial_inputs) {
          Ok(input) => self.run(loom, &weave_id, &node, input).await,
          Err(reason) => self.skip(loom, &weave_id, &node, reason),
        }
      };

      visited.insert(node_id.clone(), (outcome.status, outcome.output.clone()));
      outcomes.push(outcome);
    }

    let status = WeaveStatus::from_outcomes(&outcomes, cancelled);

    info!(
      weave_id = %weave_id,
      status = ?status,
      done = outcomes.iter().filter(|o| o.status == TerminalStatus::Done).count(),
      total = outcomes.len(),
      "weave_finished"
    );
    self.notifier.notify(WeaveEvent::WeaveFinished {
      weave_id: weave_id.clone(),
      status,
    });

    WeaveResult {
      weave_id,
      loom: loom.name.clone(),
      status,
      outcomes,
      cancelled,
      initial_inputs,
      started_at,
      finished_at: Utc::now(),
    }
  }

  /// Invoke the node's handler and record what it returned.
  async fn run(&self, loom: &mut Loom, weave_id: &str, node: &Node, input: NodeInput) -> NodeOutcome {
    set_status(loom, &node.node_id, NodeStatus::Running, None);
    info!(weave_id = %weave_id, node_id = %node.node_id, kind = node.kind.name(), "node_started");
    self.notifier.notify(WeaveEvent::NodeStarted {
      weave_id: weave_id.to_string(),
      node_id: node.node_id.clone(),
    });

    let start = Instant::now();
    let result = self
      .handlers
      .for_kind(&node.kind)
      .execute(node, input)
      .await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
      Ok(output) => {
        set_status(loom, &node.node_id, NodeStatus::Done, Some(output.clone()));
        info!(weave_id = %weave_id, node_id = %node.node_id, duration_ms, "node_completed");
        self.notifier.notify(WeaveEvent::NodeCompleted {
          weave_id: weave_id.to_string(),
          node_id: node.node_id.clone(),
          output: output.clone(),
        });

        NodeOutcome {
          node_id: node.node_id.clone(),
          name: node.name.clone(),
          status: TerminalStatus::Done,
          output: Some(output),
          error: None,
          skipped: None,
          duration_ms,
        }
      }
      Err(e) => {
        set_status(loom, &node.node_id, NodeStatus::Error, None);
        error!(weave_id = %weave_id, node_id = %node.node_id, error = %e, "node_failed");
        self.notifier.notify(WeaveEvent::NodeFailed {
          weave_id: weave_id.to_string(),
          node_id: node.node_id.clone(),
          error: e.to_string(),
        });

        NodeOutcome {
          node_id: node.node_id.clone(),
          name: node.name.clone(),
          status: TerminalStatus::Error,
          output: None,
          error: Some(NodeFailure {
            message: e.to_string(),
            delegate_unreachable: matches!(e, HandlerError::Unavailable(_)),
          }),
          skipped: None,
          duration_ms,
        }
      }
    }
  }

  /// Leave the node idle and record why it did not run.
  fn skip(&self, loom: &mut Loom, weave_id: &str, node: &Node, reason: SkipReason) -> NodeOutcome {
    set_status(loom, &node.node_id, NodeStatus::Idle, None);
    info!(weave_id = %weave_id, node_id = %node.node_id, reason = ?reason, "node_skipped");
    self.notifier.notify(WeaveEvent::NodeSkipped {
      weave_id: weave_id.to_string(),
      node_id: node.node_id.clone(),
      reason: reason.clone(),
    });

    NodeOutcome {
      node_id: node.node_id.clone(),
      name: node.name.clone(),
      status: TerminalStatus::Skipped,
      output: None,
      error: None,
      skipped: Some(reason),
      duration_ms: 0,
    }
  }
}

/// Build a node's input, or say why it must be skipped.
fn prepare_input(
  loom: &Loom,
  flow: &Graph,
  visited: &Visited,
  node: &Node,
  initial_inputs: &Map<String, Value>,
) -> Result<NodeInput, SkipReason> {
  let upstream_ids = flow.upstream(&node.node_id);
  let mut input = NodeInput::default();

  if upstream_ids.is_empty() {
    input.initial = initial_inputs
      .get(&node.node_id)
      .or_else(|| initial_inputs.get(&node.name))
      .cloned();
  } else {
    input.upstream = upstream_ids
      .iter()
      .filter_map(|id| match visited.get(id) {
        Some((TerminalStatus::Done, output)) => {
          Some((id.clone(), output.clone().unwrap_or(Value::Null)))
        }
        _ => None,
      })
      .collect();

    if input.upstream.is_empty() {
      return Err(SkipReason::UpstreamFailed);
    }
  }

  for edge in loom.incoming_guards(&node.node_id) {
    if !gate_open(loom, visited, &edge.source) {
      return Err(SkipReason::GuardClosed {
        guard_id: edge.source.clone(),
      });
    }
  }

  Ok(input)
}

/// A guard source closes its gate when its last terminal status was `error`
/// or its last output says no. Sources visited earlier in this weave are
/// judged on this weave; the rest on what the previous weave left behind.
fn gate_open(loom: &Loom, visited: &Visited, guard_id: &str) -> bool {
  match visited.get(guard_id) {
    Some((TerminalStatus::Done, output)) => output.as_ref().is_none_or(gate_allows),
    Some(_) => false,
    None => loom.get_node(guard_id).is_none_or(|guard| {
      guard.status != NodeStatus::Error && guard.last_output.as_ref().is_none_or(gate_allows)
    }),
  }
}

fn set_status(loom: &mut Loom, node_id: &str, status: NodeStatus, output: Option<Value>) {
  if let Some(node) = loom.get_node_mut(node_id) {
    node.status = status;
    node.last_output = output;
  }
}
