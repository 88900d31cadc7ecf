//! `molt.*`: drift evaluation and re-weaving.

use futures::future::BoxFuture;
use loom_molt::DEFAULT_DRIFT_THRESHOLD;
use serde_json::{Value, json};

use super::{loom_name_param, to_json};
use crate::catalog::{Capability, Catalog};
use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, InputSchema, Param, ParamType};

fn threshold_param() -> Param {
  Param::new(
    "drift_threshold",
    ParamType::Number,
    "Score in [0, 1] at or above which a molt is recommended",
  )
  .default(json!(DEFAULT_DRIFT_THRESHOLD))
}

pub(crate) fn register(catalog: &mut Catalog) {
  catalog.register(Capability::new(
    "molt.evaluate",
    "Score recent weave history for drift and recommend whether to molt",
    InputSchema::new()
      .param(loom_name_param())
      .param(threshold_param()),
    evaluate,
  ));
  catalog.register(Capability::new(
    "molt.execute",
    "Snapshot the loom, reset every node to idle and re-weave",
    InputSchema::new()
      .param(loom_name_param())
      .param(Param::string("reason", "Why the molt was requested").required()),
    execute,
  ));
  catalog.register(Capability::new(
    "molt.auto",
    "Evaluate drift and molt only if recommended",
    InputSchema::new()
      .param(loom_name_param())
      .param(threshold_param()),
    auto,
  ));
  catalog.register(Capability::new(
    "molt.audit",
    "Audit records of every molt of a loom",
    InputSchema::new().param(loom_name_param()),
    audit,
  ));
}

fn evaluate(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let decision = services
      .index
      .evaluate(args.str("loom_name")?, args.f64("drift_threshold")?)?;
    to_json(&decision)
  })
}

fn execute(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let cancel = services.shutdown.child_token();
    let record = services
      .index
      .molt(args.str("loom_name")?, args.str("reason")?, &cancel)
      .await?;
    to_json(&record)
  })
}

fn auto(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let cancel = services.shutdown.child_token();
    let outcome = services
      .index
      .molt_auto(args.str("loom_name")?, args.f64("drift_threshold")?, &cancel)
      .await?;
    to_json(&outcome)
  })
}

fn audit(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { to_json(&services.index.audit(args.str("loom_name")?)?) })
}
