use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use loom_graph::{Node, NodeKind};
use serde_json::{Value, json};

use crate::error::HandlerError;

/// Everything a node receives when it runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInput {
  /// Outputs of the upstream nodes that reached `done`, by node id.
  pub upstream: BTreeMap<String, Value>,
  /// Caller-supplied input. Only set for nodes with no upstream.
  pub initial: Option<Value>,
}

impl NodeInput {
  /// Collapse the input into one value.
  ///
  /// A single upstream output is passed as-is; several are merged into an
  /// object keyed by node id.
  pub fn merged(&self) -> Value {
    if let Some(initial) = &self.initial {
      return initial.clone();
    }
    match self.upstream.len() {
      0 => Value::Null,
      1 => self.upstream.values().next().cloned().unwrap_or(Value::Null),
      _ => Value::Object(
        self
          .upstream
          .iter()
          .map(|(k, v)| (k.clone(), v.clone()))
          .collect(),
      ),
    }
  }
}

/// Executes one kind of node.
///
/// This is where a host runtime plugs in. The weave treats the call as a
/// black box: it either returns an output or a typed failure.
#[async_trait]
pub trait NodeHandler: Send + Sync {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError>;
}

/// Returns the merged input, or the node's payload when there is none.
#[derive(Debug, Clone, Default)]
pub struct PassthroughHandler;

#[async_trait]
impl NodeHandler for PassthroughHandler {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError> {
    match input.merged() {
      Value::Null => Ok(node.kind.payload().clone()),
      merged => Ok(merged),
    }
  }
}

/// Default guard handler.
///
/// Reads `allow` from the node payload (default `true`) and emits
/// `{"allow": bool, "input": <merged input>}`.
#[derive(Debug, Clone, Default)]
pub struct GateHandler;

#[async_trait]
impl NodeHandler for GateHandler {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError> {
    let allow = node
      .kind
      .payload()
      .get("allow")
      .and_then(Value::as_bool)
      .unwrap_or(true);
    Ok(json!({ "allow": allow, "input": input.merged() }))
  }
}

/// Does a guard output let its targets run?
///
/// Closed for JSON `false` and for objects whose `allow` is `false`.
pub fn gate_allows(output: &Value) -> bool {
  match output {
    Value::Bool(allow) => *allow,
    Value::Object(map) => map.get("allow").and_then(Value::as_bool).unwrap_or(true),
    _ => true,
  }
}

/// One handler per node kind.
///
/// Override individual kinds with struct update syntax:
///
/// ```ignore
/// let handlers = HandlerSet {
///   action: Arc::new(MailSender::new(client)),
///   ..HandlerSet::default()
/// };
/// ```
#[derive(Clone)]
pub struct HandlerSet {
  pub source: Arc<dyn NodeHandler>,
  pub transform: Arc<dyn NodeHandler>,
  pub action: Arc<dyn NodeHandler>,
  pub guard: Arc<dyn NodeHandler>,
  pub control: Arc<dyn NodeHandler>,
}

impl HandlerSet {
  pub fn for_kind(&self, kind: &NodeKind) -> &Arc<dyn NodeHandler> {
    match kind {
      NodeKind::Source { .. } => &self.source,
      NodeKind::Transform { .. } => &self.transform,
      NodeKind::Action { .. } => &self.action,
      NodeKind::Guard { .. } => &self.guard,
      NodeKind::Control { .. } => &self.control,
    }
  }
}

impl Default for HandlerSet {
  fn default() -> Self {
    let passthrough: Arc<dyn NodeHandler> = Arc::new(PassthroughHandler);
    Self {
      source: passthrough.clone(),
      transform: passthrough.clone(),
      action: passthrough.clone(),
      guard: Arc::new(GateHandler),
      control: passthrough,
    }
  }
}
