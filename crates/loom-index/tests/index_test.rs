//! Locking, history and molt behaviour of the loom index.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_graph::{GraphError, Node, NodeKind, NodeStatus, YarnKind};
use loom_index::{IndexError, IndexOptions, LoomIndex};
use loom_molt::{MoltError, MoltPhase};
use loom_weave::{HandlerError, HandlerSet, NodeHandler, NodeInput, WeaveStatus, Weaver};
use serde_json::{Map, Value, json};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Holds nodes named "hold" until released; fails nodes named "bad".
#[derive(Default)]
struct Gate {
  started: Notify,
  release: Notify,
}

#[async_trait]
impl NodeHandler for Gate {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError> {
    match node.name.as_str() {
      "hold" => {
        self.started.notify_one();
        self.release.notified().await;
      }
      "bad" => return Err(HandlerError::failed("bad node")),
      _ => {}
    }
    Ok(input.merged())
  }
}

fn index_with(gate: Arc<Gate>, lock_timeout: Duration) -> LoomIndex {
  let handlers = HandlerSet {
    source: gate.clone(),
    transform: gate.clone(),
    action: gate.clone(),
    guard: gate.clone(),
    control: gate,
  };
  let options = IndexOptions {
    lock_timeout,
    ..IndexOptions::default()
  };
  LoomIndex::new(options, Weaver::new(handlers))
}

fn source() -> NodeKind {
  NodeKind::Source { payload: Value::Null }
}

fn inputs(value: Value) -> Map<String, Value> {
  serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_concurrent_molts_exactly_one_proceeds() {
  let gate = Arc::new(Gate::default());
  let index = Arc::new(index_with(gate.clone(), Duration::from_secs(5)));
  index.create("main").unwrap();
  index.add_node("main", "hold", source(), None).await.unwrap();

  let first = tokio::spawn({
    let index = index.clone();
    async move { index.molt("main", "first", &CancellationToken::new()).await }
  });
  gate.started.notified().await;

  let second = index.molt("main", "second", &CancellationToken::new()).await;
  assert!(matches!(
    second,
    Err(IndexError::Molt(MoltError::Busy {
      phase: MoltPhase::Molting,
      ..
    }))
  ));

  gate.release.notify_one();
  let record = first.await.unwrap().unwrap();
  assert_eq!(record.reason, "first");
  assert_eq!(index.audit("main").unwrap().len(), 1);
  assert_eq!(index.list()[0].phase, MoltPhase::Stable);
}

#[tokio::test]
async fn test_writer_times_out_behind_weave_but_readers_do_not() {
  let gate = Arc::new(Gate::default());
  let index = Arc::new(index_with(gate.clone(), Duration::from_millis(50)));
  index.create("main").unwrap();
  let hold = index.add_node("main", "hold", source(), None).await.unwrap();

  let weave = tokio::spawn({
    let index = index.clone();
    async move { index.weave("main", Map::new(), &CancellationToken::new()).await }
  });
  gate.started.notified().await;

  let err = index.add_node("main", "late", source(), None).await.unwrap_err();
  assert!(matches!(err, IndexError::LockTimeout { .. }));

  // Readers see the last published state, not the weave in progress.
  let snapshot = index.snapshot("main").unwrap();
  assert_eq!(snapshot.node_count(), 1);
  assert_eq!(snapshot.get_node(&hold).unwrap().status, NodeStatus::Idle);
  assert_eq!(index.topology("main").unwrap().adjacency.len(), 1);

  gate.release.notify_one();
  let result = weave.await.unwrap().unwrap();
  assert_eq!(result.status, WeaveStatus::Success);
  assert_eq!(
    index.snapshot("main").unwrap().get_node(&hold).unwrap().status,
    NodeStatus::Done
  );
}

#[tokio::test]
async fn test_different_looms_weave_in_parallel() {
  let gate = Arc::new(Gate::default());
  let index = Arc::new(index_with(gate.clone(), Duration::from_secs(5)));
  index.create("blocked").unwrap();
  index.create("free").unwrap();
  index.add_node("blocked", "hold", source(), None).await.unwrap();
  index.add_node("free", "quick", source(), None).await.unwrap();

  let blocked = tokio::spawn({
    let index = index.clone();
    async move { index.weave("blocked", Map::new(), &CancellationToken::new()).await }
  });
  gate.started.notified().await;

  let free = index
    .weave("free", Map::new(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(free.status, WeaveStatus::Success);
  assert!(!blocked.is_finished());

  gate.release.notify_one();
  blocked.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_molt_appends_history_and_reuses_last_good_inputs() {
  let index = index_with(Arc::new(Gate::default()), Duration::from_secs(5));
  index.create("main").unwrap();
  index.add_node("main", "src", source(), None).await.unwrap();

  let cancel = CancellationToken::new();
  let good = inputs(json!({ "src": 7 }));
  let first = index.weave("main", good.clone(), &cancel).await.unwrap();
  let second = index.weave("main", Map::new(), &cancel).await.unwrap();

  let record = index.molt("main", "operator request", &cancel).await.unwrap();

  let history = index.history("main", 10).unwrap();
  assert_eq!(history.len(), 3);
  assert_eq!(history[0], first);
  assert_eq!(history[1], second);
  assert_eq!(history[2], record.after_weave);

  // both earlier weaves succeeded; the latest one had no inputs
  assert_eq!(record.after_weave.initial_inputs, Map::new());
  assert!(record.triggering_decision.is_none());

  let snapshots = index.molt_snapshots("main").unwrap();
  assert_eq!(snapshots.len(), 1);
  assert_eq!(snapshots[0].snapshot_id, record.before_snapshot_id);
  assert_eq!(snapshots[0].history_len, 2);
  assert_eq!(snapshots[0].definition, index.export("main").unwrap());
}

#[tokio::test]
async fn test_molt_skips_failed_weaves_when_choosing_inputs() {
  let index = index_with(Arc::new(Gate::default()), Duration::from_secs(5));
  index.create("main").unwrap();
  let src = index.add_node("main", "src", source(), None).await.unwrap();

  let cancel = CancellationToken::new();
  let good = inputs(json!({ "src": "good" }));
  index.weave("main", good.clone(), &cancel).await.unwrap();

  let bad = index
    .add_node("main", "bad", NodeKind::Action { payload: Value::Null }, None)
    .await
    .unwrap();
  index.connect("main", &src, &bad, YarnKind::Data).await.unwrap();
  let partial = index
    .weave("main", inputs(json!({ "src": "later" })), &cancel)
    .await
    .unwrap();
  assert_eq!(partial.status, WeaveStatus::Partial);

  let record = index.molt("main", "retry", &cancel).await.unwrap();
  assert_eq!(record.after_weave.initial_inputs, good);
}

#[tokio::test]
async fn test_molt_auto_follows_the_decision() {
  let index = index_with(Arc::new(Gate::default()), Duration::from_secs(5));
  let cancel = CancellationToken::new();
  index.create("main").unwrap();
  index.add_node("main", "fine", source(), None).await.unwrap();
  index.weave("main", Map::new(), &cancel).await.unwrap();

  let calm = index.molt_auto("main", 0.5, &cancel).await.unwrap();
  assert!(!calm.decision.recommended);
  assert!(calm.record.is_none());
  assert!(index.audit("main").unwrap().is_empty());

  index
    .add_node("main", "bad", NodeKind::Action { payload: Value::Null }, None)
    .await
    .unwrap();
  index.weave("main", Map::new(), &cancel).await.unwrap();
  index.weave("main", Map::new(), &cancel).await.unwrap();

  let stormy = index.molt_auto("main", 0.3, &cancel).await.unwrap();
  assert!(stormy.decision.recommended);
  let record = stormy.record.unwrap();
  assert_eq!(record.triggering_decision, Some(stormy.decision.clone()));
  assert_eq!(stormy.decision.degraded_nodes.len(), 1);
  assert_eq!(index.audit("main").unwrap(), vec![record]);
}

#[tokio::test]
async fn test_invalid_threshold_is_rejected() {
  let index = index_with(Arc::new(Gate::default()), Duration::from_secs(5));
  index.create("main").unwrap();

  assert!(matches!(
    index.evaluate("main", 2.0),
    Err(IndexError::Molt(MoltError::InvalidThreshold { .. }))
  ));
  assert!(
    index
      .molt_auto("main", -1.0, &CancellationToken::new())
      .await
      .is_err()
  );
  assert_eq!(index.list()[0].phase, MoltPhase::Stable);
}

#[tokio::test]
async fn test_history_is_bounded() {
  let options = IndexOptions {
    history_limit: 3,
    ..IndexOptions::default()
  };
  let index = LoomIndex::new(options, Weaver::new(HandlerSet::default()));
  index.create("main").unwrap();

  let cancel = CancellationToken::new();
  let mut ids = Vec::new();
  for _ in 0..5 {
    ids.push(index.weave("main", Map::new(), &cancel).await.unwrap().weave_id);
  }

  let kept: Vec<_> = index
    .history("main", 10)
    .unwrap()
    .into_iter()
    .map(|r| r.weave_id)
    .collect();
  assert_eq!(kept, ids[2..]);
  assert_eq!(index.history("main", 1).unwrap()[0].weave_id, ids[4]);
}

#[tokio::test]
async fn test_audit_is_bounded_with_snapshots() {
  let options = IndexOptions {
    snapshot_limit: 2,
    ..IndexOptions::default()
  };
  let index = LoomIndex::new(options, Weaver::new(HandlerSet::default()));
  index.create("main").unwrap();

  let cancel = CancellationToken::new();
  let mut ids = Vec::new();
  for i in 0..4 {
    let reason = format!("round {i}");
    ids.push(index.molt("main", &reason, &cancel).await.unwrap().molt_id);
  }

  let audit = index.audit("main").unwrap();
  let kept: Vec<_> = audit.iter().map(|r| r.molt_id.clone()).collect();
  assert_eq!(kept, ids[2..]);

  let snapshots: Vec<_> = index
    .molt_snapshots("main")
    .unwrap()
    .into_iter()
    .map(|s| s.snapshot_id)
    .collect();
  for record in &audit {
    assert!(snapshots.contains(&record.before_snapshot_id));
  }
}

#[tokio::test]
async fn test_zero_drift_window_still_detects_failures() {
  let gate = Arc::new(Gate::default());
  let handlers = HandlerSet {
    source: gate.clone(),
    transform: gate.clone(),
    action: gate.clone(),
    guard: gate.clone(),
    control: gate,
  };
  let options = IndexOptions {
    drift_window: 0,
    ..IndexOptions::default()
  };
  let index = LoomIndex::new(options, Weaver::new(handlers));
  index.create("main").unwrap();
  index.add_node("main", "bad", source(), None).await.unwrap();

  let cancel = CancellationToken::new();
  for _ in 0..3 {
    index.weave("main", Map::new(), &cancel).await.unwrap();
  }

  let decision = index.evaluate("main", 0.5).unwrap();
  assert_eq!(decision.weaves_considered, 1);
  assert!(decision.score > 0.0);
  assert!(decision.recommended);
}

#[tokio::test]
async fn test_structural_errors() {
  let index = LoomIndex::new(IndexOptions::default(), Weaver::new(HandlerSet::default()));

  assert!(matches!(
    index.create(" "),
    Err(IndexError::InvalidName(_))
  ));
  assert!(matches!(
    index.topology("missing"),
    Err(IndexError::LoomNotFound { .. })
  ));

  index.create("main").unwrap();
  assert!(matches!(
    index.create("main"),
    Err(IndexError::LoomExists { .. })
  ));
  index.ensure("main").unwrap();

  let a = index.add_node("main", "a", source(), None).await.unwrap();
  let b = index.add_node("main", "b", source(), None).await.unwrap();
  index.connect("main", &a, &b, YarnKind::Data).await.unwrap();

  let err = index.connect("main", &b, &a, YarnKind::Signal).await.unwrap_err();
  assert!(matches!(err, IndexError::Graph(GraphError::Cycle { .. })));
  let err = index.remove_node("main", "ghost").await.unwrap_err();
  assert!(matches!(err, IndexError::Graph(GraphError::NodeNotFound(_))));

  assert_eq!(index.topology("main").unwrap().edges.len(), 1);
}

#[tokio::test]
async fn test_export_import_round_trip() {
  let index = LoomIndex::new(IndexOptions::default(), Weaver::new(HandlerSet::default()));
  index.create("main").unwrap();
  let a = index.add_node("main", "a", source(), None).await.unwrap();
  let g = index
    .add_node("main", "g", NodeKind::Guard { payload: json!({ "allow": true }) }, None)
    .await
    .unwrap();
  index.connect("main", &g, &a, YarnKind::Guard).await.unwrap();

  let mut def = index.export("main").unwrap();
  def.name = "copy".to_string();
  assert_eq!(index.import(def.clone()).unwrap(), "copy");
  assert_eq!(index.export("copy").unwrap(), def);

  assert!(matches!(
    index.import(def),
    Err(IndexError::LoomExists { .. })
  ));
  let names: Vec<_> = index.list().into_iter().map(|s| s.name).collect();
  assert_eq!(names, vec!["copy", "main"]);
}
