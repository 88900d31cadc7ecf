//! `agent.*`, `memory.*` and `skill.*`: forwarded to external collaborators.

use futures::future::BoxFuture;
use serde_json::{Value, json};

use super::to_json;
use crate::catalog::{Capability, Catalog};
use crate::dispatcher::Services;
use crate::error::CapabilityError;
use crate::schema::{Args, InputSchema, Param, ParamType};

pub(crate) fn register(catalog: &mut Catalog) {
  catalog.register(Capability::new(
    "agent.chat",
    "Send a message to the conversational agent",
    InputSchema::new().param(Param::string("message", "Message text").required()),
    chat,
  ));
  catalog.register(Capability::new(
    "agent.status",
    "Status reported by the conversational agent",
    InputSchema::new(),
    status,
  ));
  catalog.register(Capability::new(
    "memory.save",
    "Save content to long-term memory",
    InputSchema::new()
      .param(Param::string("content", "Text to remember").required())
      .param(Param::new("tags", ParamType::Array, "Tags for the entry")),
    save,
  ));
  catalog.register(Capability::new(
    "memory.search",
    "Search long-term memory",
    InputSchema::new()
      .param(Param::string("query", "Search text").required())
      .param(Param::new("max_results", ParamType::Integer, "Maximum entries to return").default(json!(5))),
    search,
  ));
  catalog.register(Capability::new(
    "skill.execute",
    "Run a skill from the skill provider",
    InputSchema::new()
      .param(Param::string("skill_name", "Skill to run").required())
      .param(Param::new("arguments", ParamType::Object, "Arguments passed to the skill")),
    execute_skill,
  ));
  catalog.register(Capability::new(
    "skill.list",
    "Skills the skill provider currently offers",
    InputSchema::new(),
    list_skills,
  ));
}

fn chat(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let response = services.agent.chat(args.str("message")?).await?;
    Ok(json!({ "response": response }))
  })
}

fn status(services: &Services, _args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { Ok(services.agent.status().await?) })
}

fn save(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let tags = args.strings("tags")?;
    let entry = services.memory.save(args.str("content")?, tags).await?;
    to_json(&entry)
  })
}

fn search(services: &Services, args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let hits = services
      .memory
      .search(args.str("query")?, args.usize("max_results")?)
      .await?;
    to_json(&hits)
  })
}

fn execute_skill(services: &Services, mut args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move {
    let arguments = Value::Object(args.object("arguments"));
    Ok(services.skills.execute(args.str("skill_name")?, arguments).await?)
  })
}

fn list_skills(services: &Services, _args: Args) -> BoxFuture<'_, Result<Value, CapabilityError>> {
  Box::pin(async move { to_json(&services.skills.list().await?) })
}
