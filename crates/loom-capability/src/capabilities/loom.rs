//! `loom.*`: weaving and whole-loom operations.

use futures::future::BoxFuture;
use loom_config::LoomDef;
use serde_json::{Value, json};

use super::{loom_name_param, to_json};
use crate::catalog::{Capability, Catalog};
use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, InputSchema, Param, ParamType};

pub(crate) fn register(catalog: &mut Catalog) {
  catalog.register(Capability::new(
    "loom.weave",
    "Execute every node of a loom in dependency order and return the weave result",
    InputSchema::new().param(loom_name_param()).param(Param::new(
      "initial_inputs",
      ParamType::Object,
      "Payloads for nodes without predecessors, keyed by node id or name",
    )),
    weave,
  ));
  catalog.register(Capability::new(
    "loom.getTopology",
    "Adjacency list and typed yarns of a loom",
    InputSchema::new().param(loom_name_param()),
    topology,
  ));
  catalog.register(Capability::new(
    "loom.create",
    "Create an empty loom",
    InputSchema::new().param(loom_name_param()),
    create,
  ));
  catalog.register(Capability::new(
    "loom.list",
    "Every loom with its size, weave count and molt phase",
    InputSchema::new(),
    list,
  ));
  catalog.register(Capability::new(
    "loom.history",
    "Most recent weave results of a loom, oldest first",
    InputSchema::new()
      .param(loom_name_param())
      .param(Param::new("limit", ParamType::Integer, "How many results to return").default(json!(10))),
    history,
  ));
  catalog.register(Capability::new(
    "loom.export",
    "Serializable definition of a loom",
    InputSchema::new().param(loom_name_param()),
    export,
  ));
  catalog.register(Capability::new(
    "loom.import",
    "Create a loom from a definition",
    InputSchema::new().param(
      Param::new(
        "definition",
        ParamType::Object,
        "Loom definition with name, nodes and edges",
      )
      .required(),
    ),
    import,
  ));
}

fn weave(services: &Services, mut args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let inputs = args.object("initial_inputs");
    let loom = args.str("loom_name")?;
    let cancel = services.shutdown.child_token();
    let result = services.index.weave(loom, inputs, &cancel).await?;
    to_json(&result)
  })
}

fn topology(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { to_json(&services.index.topology(args.str("loom_name")?)?) })
}

fn create(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let name = args.str("loom_name")?;
    services.index.create(name)?;
    Ok(json!({ "loom_name": name }))
  })
}

fn list(services: &Services, _args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { to_json(&services.index.list()) })
}

fn history(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let results = services
      .index
      .history(args.str("loom_name")?, args.usize("limit")?)?;
    to_json(&results)
  })
}

fn export(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { to_json(&services.index.export(args.str("loom_name")?)?) })
}

fn import(services: &Services, mut args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let definition = args.take("definition").unwrap_or(Value::Null);
    let def: LoomDef = serde_json::from_value(definition)
      .map_err(|e| CapabilityError::validation(format!("invalid loom definition: {e}")))?;
    let name = services.index.import(def)?;
    Ok(json!({ "loom_name": name }))
  })
}
