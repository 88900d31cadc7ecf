//! Weave behaviour over small looms with scripted handlers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loom_graph::{Loom, Node, NodeKind, NodeStatus, YarnKind};
use loom_weave::{
  ChannelNotifier, HandlerError, HandlerSet, NodeHandler, NodeInput, SkipReason, TerminalStatus,
  WeaveEvent, WeaveStatus, Weaver,
};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Records every call and fails the nodes it is told to.
#[derive(Default)]
struct Scripted {
  fail: Vec<&'static str>,
  unreachable: Vec<&'static str>,
  cancel_after: Option<(&'static str, CancellationToken)>,
  calls: Mutex<Vec<String>>,
}

#[async_trait]
impl NodeHandler for Scripted {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError> {
    self.calls.lock().unwrap().push(node.name.clone());

    if let Some((name, token)) = &self.cancel_after
      && node.name == *name
    {
      token.cancel();
    }
    if self.fail.contains(&node.name.as_str()) {
      return Err(HandlerError::failed(format!("{} exploded", node.name)));
    }
    if self.unreachable.contains(&node.name.as_str()) {
      return Err(HandlerError::unavailable("backend offline"));
    }
    Ok(json!({ "from": node.name, "input": input.merged() }))
  }
}

impl Scripted {
  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

fn all_kinds(handler: Arc<Scripted>) -> HandlerSet {
  HandlerSet {
    source: handler.clone(),
    transform: handler.clone(),
    action: handler.clone(),
    guard: handler.clone(),
    control: handler,
  }
}

fn add(loom: &mut Loom, id: &str, kind: &str) {
  let kind = NodeKind::from_name(kind, Value::Null).unwrap();
  loom.insert_node(Node::new(id, kind).with_id(id)).unwrap();
}

fn chain() -> Loom {
  let mut loom = Loom::new("chain");
  add(&mut loom, "a", "source");
  add(&mut loom, "b", "transform");
  add(&mut loom, "c", "action");
  loom.connect("a", "b", YarnKind::Data).unwrap();
  loom.connect("b", "c", YarnKind::Data).unwrap();
  loom
}

#[tokio::test]
async fn test_chain_with_failing_middle_is_partial() {
  let handler = Arc::new(Scripted {
    fail: vec!["b"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler.clone()));
  let mut loom = chain();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  assert_eq!(result.outcome("a").unwrap().status, TerminalStatus::Done);
  assert_eq!(result.outcome("b").unwrap().status, TerminalStatus::Error);
  let c = result.outcome("c").unwrap();
  assert_eq!(c.status, TerminalStatus::Skipped);
  assert_eq!(c.skipped, Some(SkipReason::UpstreamFailed));
  assert_eq!(result.status, WeaveStatus::Partial);

  assert_eq!(handler.calls(), vec!["a", "b"]);
  assert_eq!(loom.get_node("b").unwrap().status, NodeStatus::Error);
  assert_eq!(loom.get_node("c").unwrap().status, NodeStatus::Idle);
}

#[tokio::test]
async fn test_all_failing_is_failed() {
  let handler = Arc::new(Scripted {
    fail: vec!["a"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler));
  let mut loom = chain();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  assert_eq!(result.status, WeaveStatus::Failed);
  assert_eq!(result.count(TerminalStatus::Skipped), 2);
}

#[tokio::test]
async fn test_errored_guard_skips_target_without_calling_it() {
  let handler = Arc::new(Scripted {
    fail: vec!["gate"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler.clone()));

  let mut loom = Loom::new("guarded");
  add(&mut loom, "gate", "guard");
  add(&mut loom, "send", "action");
  loom.connect("gate", "send", YarnKind::Guard).unwrap();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  let send = result.outcome("send").unwrap();
  assert_eq!(send.status, TerminalStatus::Skipped);
  assert_eq!(
    send.skipped,
    Some(SkipReason::GuardClosed {
      guard_id: "gate".to_string()
    })
  );
  assert_eq!(loom.get_node("send").unwrap().status, NodeStatus::Idle);
  assert!(!handler.calls().contains(&"send".to_string()));
}

#[tokio::test]
async fn test_guard_uses_last_recorded_status() {
  // b -> a (data) and a -> b (guard): the guard source runs after its
  // target, so the target is judged on the previous weave.
  let handler = Arc::new(Scripted {
    fail: vec!["b"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler.clone()));

  let mut loom = Loom::new("feedback");
  add(&mut loom, "a", "action");
  add(&mut loom, "b", "guard");
  loom.connect("a", "b", YarnKind::Data).unwrap();
  loom.connect("b", "a", YarnKind::Guard).unwrap();

  let first = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;
  assert_eq!(first.outcome("a").unwrap().status, TerminalStatus::Done);
  assert_eq!(first.outcome("b").unwrap().status, TerminalStatus::Error);

  let second = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;
  assert_eq!(second.outcome("a").unwrap().status, TerminalStatus::Skipped);
  assert_eq!(second.status, WeaveStatus::Failed);
}

#[tokio::test]
async fn test_default_gate_handler_closes_on_payload() {
  let weaver = Weaver::new(HandlerSet::default());

  let mut loom = Loom::new("approval");
  loom
    .insert_node(
      Node::new("approve", NodeKind::Guard {
        payload: json!({ "allow": false }),
      })
      .with_id("g"),
    )
    .unwrap();
  add(&mut loom, "t", "action");
  loom.connect("g", "t", YarnKind::Guard).unwrap();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;
  assert_eq!(result.outcome("g").unwrap().status, TerminalStatus::Done);
  assert_eq!(result.outcome("t").unwrap().status, TerminalStatus::Skipped);

  loom.set_payload("g", json!({ "allow": true })).unwrap();
  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;
  assert_eq!(result.status, WeaveStatus::Success);
}

#[tokio::test]
async fn test_weave_order_is_deterministic() {
  let weaver = Weaver::new(HandlerSet::default());

  let mut loom = Loom::new("diamond");
  let src = loom.add_node("src", NodeKind::Source { payload: Value::Null }, None);
  let left = loom.add_node("left", NodeKind::Transform { payload: Value::Null }, None);
  let right = loom.add_node("right", NodeKind::Transform { payload: Value::Null }, None);
  let sink = loom.add_node("sink", NodeKind::Action { payload: Value::Null }, None);
  loom.add_node("other", NodeKind::Control { payload: Value::Null }, None);
  loom.connect(&src, &left, YarnKind::Data).unwrap();
  loom.connect(&src, &right, YarnKind::Data).unwrap();
  loom.connect(&left, &sink, YarnKind::Data).unwrap();
  loom.connect(&right, &sink, YarnKind::State).unwrap();

  let inputs: Map<String, Value> = serde_json::from_value(json!({ "src": { "n": 1 } })).unwrap();
  let first = weaver
    .weave(&mut loom, inputs.clone(), &CancellationToken::new())
    .await;
  let second = weaver
    .weave(&mut loom, inputs, &CancellationToken::new())
    .await;

  assert_eq!(first.completion_order(), second.completion_order());
  assert_eq!(first.completion_order().len(), 5);

  let order = first.completion_order();
  let position = |id: &str| order.iter().position(|n| *n == id).unwrap();
  assert!(position(src.as_str()) < position(left.as_str()));
  assert!(position(right.as_str()) < position(sink.as_str()));
}

#[tokio::test]
async fn test_initial_inputs_reach_roots_by_id_or_name() {
  let handler = Arc::new(Scripted::default());
  let weaver = Weaver::new(all_kinds(handler));
  let mut loom = chain();
  loom
    .insert_node(Node::new("lonely", NodeKind::Source { payload: Value::Null }).with_id("l1"))
    .unwrap();

  let inputs: Map<String, Value> =
    serde_json::from_value(json!({ "a": "by-id", "lonely": "by-name" })).unwrap();
  let result = weaver
    .weave(&mut loom, inputs, &CancellationToken::new())
    .await;

  assert_eq!(result.outcome("a").unwrap().output.as_ref().unwrap()["input"], "by-id");
  assert_eq!(result.outcome("l1").unwrap().output.as_ref().unwrap()["input"], "by-name");
  // b receives a's output, not the initial input
  assert_eq!(result.outcome("b").unwrap().output.as_ref().unwrap()["input"]["from"], "a");
}

#[tokio::test]
async fn test_join_runs_on_surviving_upstream() {
  let handler = Arc::new(Scripted {
    fail: vec!["left"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler));

  let mut loom = Loom::new("join");
  add(&mut loom, "left", "source");
  add(&mut loom, "right", "source");
  add(&mut loom, "sink", "action");
  loom.connect("left", "sink", YarnKind::Data).unwrap();
  loom.connect("right", "sink", YarnKind::Data).unwrap();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  let sink = result.outcome("sink").unwrap();
  assert_eq!(sink.status, TerminalStatus::Done);
  assert_eq!(sink.output.as_ref().unwrap()["input"]["from"], "right");
}

#[tokio::test]
async fn test_cancel_between_nodes_is_partial() {
  let token = CancellationToken::new();
  let handler = Arc::new(Scripted {
    cancel_after: Some(("a", token.clone())),
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler.clone()));
  let mut loom = chain();

  let result = weaver.weave(&mut loom, Map::new(), &token).await;

  assert!(result.cancelled);
  assert_eq!(result.status, WeaveStatus::Partial);
  assert_eq!(result.outcome("a").unwrap().status, TerminalStatus::Done);
  assert_eq!(result.outcome("b").unwrap().skipped, Some(SkipReason::Cancelled));
  assert_eq!(result.outcome("c").unwrap().skipped, Some(SkipReason::Cancelled));
  assert_eq!(handler.calls(), vec!["a"]);
}

#[tokio::test]
async fn test_unreachable_delegate_is_flagged() {
  let handler = Arc::new(Scripted {
    unreachable: vec!["a"],
    ..Default::default()
  });
  let weaver = Weaver::new(all_kinds(handler));
  let mut loom = chain();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  let a = result.outcome("a").unwrap();
  assert!(a.error.as_ref().unwrap().delegate_unreachable);
}

#[tokio::test]
async fn test_channel_notifier_streams_events() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let weaver = Weaver::with_notifier(HandlerSet::default(), Arc::new(ChannelNotifier::new(tx)));
  let mut loom = chain();

  let result = weaver
    .weave(&mut loom, Map::new(), &CancellationToken::new())
    .await;

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  assert!(matches!(events.first(), Some(WeaveEvent::WeaveStarted { .. })));
  assert!(matches!(
    events.last(),
    Some(WeaveEvent::WeaveFinished { status: WeaveStatus::Success, .. })
  ));
  let completed = events
    .iter()
    .filter(|e| matches!(e, WeaveEvent::NodeCompleted { .. }))
    .count();
  assert_eq!(completed, result.outcomes.len());
}
