//! `canvas.*`: graph edits.

use std::str::FromStr;

use futures::future::BoxFuture;
use loom_graph::{NodeKind, Position, YarnKind};
use serde_json::{Value, json};

use super::{target_loom, target_loom_param};
use crate::catalog::{Capability, Catalog};
use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, InputSchema, Param, ParamType};

pub(crate) fn register(catalog: &mut Catalog) {
  catalog.register(Capability::new(
    "canvas.addNode",
    "Add an idle node to a loom and return its id",
    InputSchema::new()
      .param(Param::string("name", "Display name").required())
      .param(
        Param::string("node_type", "Kind of node")
          .one_of(&NodeKind::NAMES)
          .required(),
      )
      .param(Param::new("position", ParamType::Object, "Canvas position {x, y}"))
      .param(Param::new(
        "payload",
        ParamType::Object,
        "Kind-specific configuration",
      ))
      .param(target_loom_param()),
    add_node,
  ));
  catalog.register(Capability::new(
    "canvas.connect",
    "Connect two nodes with a typed yarn",
    yarn_schema(),
    connect,
  ));
  catalog.register(Capability::new(
    "canvas.disconnect",
    "Remove a typed yarn between two nodes",
    yarn_schema(),
    disconnect,
  ));
  catalog.register(Capability::new(
    "canvas.removeNode",
    "Remove a node and every yarn touching it",
    InputSchema::new()
      .param(Param::string("node_id", "Node to remove").required())
      .param(target_loom_param()),
    remove_node,
  ));
  catalog.register(Capability::new(
    "canvas.setPayload",
    "Replace a node's kind-specific configuration",
    InputSchema::new()
      .param(Param::string("node_id", "Node to edit").required())
      .param(Param::new("payload", ParamType::Object, "New configuration").required())
      .param(target_loom_param()),
    set_payload,
  ));
}

fn yarn_schema() -> InputSchema {
  InputSchema::new()
    .param(Param::string("source_id", "Upstream node").required())
    .param(Param::string("target_id", "Downstream node").required())
    .param(
      Param::string("yarn_type", "Kind of yarn")
        .one_of(&YarnKind::NAMES)
        .default(json!(YarnKind::Data.as_str())),
    )
    .param(target_loom_param())
}

fn yarn_kind(args: &Args) -> Result<YarnKind, CapabilityError> {
  YarnKind::from_str(args.str("yarn_type")?).map_err(|e| CapabilityError::validation(e.to_string()))
}

fn add_node(services: &Services, mut args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let payload = args.take("payload").unwrap_or(Value::Null);
    let position = args
      .take("position")
      .map(serde_json::from_value::<Position>)
      .transpose()
      .map_err(|e| CapabilityError::validation(format!("invalid position: {e}")))?;
    let kind = NodeKind::from_name(args.str("node_type")?, payload)
      .map_err(|e| CapabilityError::validation(e.to_string()))?;

    let loom = target_loom(services, &args);
    let node_id = services
      .index
      .add_node(loom, args.str("name")?, kind, position)
      .await?;
    Ok(json!({ "node_id": node_id, "loom_name": loom }))
  })
}

fn connect(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let kind = yarn_kind(&args)?;
    let (source, target) = (args.str("source_id")?, args.str("target_id")?);
    let created = services
      .index
      .connect(target_loom(services, &args), source, target, kind)
      .await?;
    Ok(json!({ "source_id": source, "target_id": target, "yarn_type": kind, "created": created }))
  })
}

fn disconnect(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let kind = yarn_kind(&args)?;
    let (source, target) = (args.str("source_id")?, args.str("target_id")?);
    let removed = services
      .index
      .disconnect(target_loom(services, &args), source, target, kind)
      .await?;
    Ok(json!({ "source_id": source, "target_id": target, "yarn_type": kind, "removed": removed }))
  })
}

fn remove_node(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let node_id = args.str("node_id")?;
    services
      .index
      .remove_node(target_loom(services, &args), node_id)
      .await?;
    Ok(json!({ "removed": node_id }))
  })
}

fn set_payload(services: &Services, mut args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let payload = args.take("payload").unwrap_or(Value::Null);
    let node_id = args.str("node_id")?;
    services
      .index
      .set_payload(target_loom(services, &args), node_id, payload)
      .await?;
    Ok(json!({ "node_id": node_id }))
  })
}
