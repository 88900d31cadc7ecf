use std::sync::Arc;

use async_trait::async_trait;
use loom_graph::Node;
use loom_weave::{HandlerError, NodeHandler, NodeInput, PassthroughHandler};
use serde_json::{Map, Value};

use crate::delegate::{DelegateError, SkillProvider};

/// Runs action nodes whose payload names a skill.
///
/// A payload of `{"skill": "name", "arguments": {...}}` calls the skill with
/// the payload arguments plus an `input` field carrying the merged upstream
/// input. Nodes without a `skill` pass their input through.
pub struct SkillActionHandler {
  skills: Arc<dyn SkillProvider>,
}

impl SkillActionHandler {
  pub fn new(skills: Arc<dyn SkillProvider>) -> Self {
    Self { skills }
  }
}

#[async_trait]
impl NodeHandler for SkillActionHandler {
  async fn execute(&self, node: &Node, input: NodeInput) -> Result<Value, HandlerError> {
    let payload = node.kind.payload();
    let Some(skill) = payload.get("skill").and_then(Value::as_str) else {
      return PassthroughHandler.execute(node, input).await;
    };

    let mut arguments = match payload.get("arguments") {
      Some(Value::Object(map)) => map.clone(),
      _ => Map::new(),
    };
    arguments.insert("input".to_string(), input.merged());

    self
      .skills
      .execute(skill, Value::Object(arguments))
      .await
      .map_err(|e| match e {
        DelegateError::Unavailable(message) => HandlerError::Unavailable(message),
        DelegateError::Failed(message) => HandlerError::Failed(message),
      })
  }
}
