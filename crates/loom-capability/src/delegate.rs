//! Seams to the collaborators the core does not implement.
//!
//! The agent, the memory store and the skill provider are black boxes
//! reachable over some transport. Implementations decide how; the core only
//! forwards arguments and relays results or a typed failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
  /// The collaborator could not be reached; nothing was attempted.
  #[error("delegate unreachable: {0}")]
  Unavailable(String),

  /// The collaborator ran the request and it failed.
  #[error("{0}")]
  Failed(String),
}

/// The conversational agent.
#[async_trait]
pub trait Agent: Send + Sync {
  async fn chat(&self, message: &str) -> Result<String, DelegateError>;

  async fn status(&self) -> Result<Value, DelegateError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
  pub memory_id: String,
  pub content: String,
  #[serde(default)]
  pub tags: Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Long-term memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
  async fn save(&self, content: &str, tags: Vec<String>) -> Result<MemoryEntry, DelegateError>;

  /// Best matches first, at most `max_results`.
  async fn search(&self, query: &str, max_results: usize) -> Result<Vec<MemoryEntry>, DelegateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
  pub name: String,
  #[serde(default)]
  pub description: String,
}

/// Dynamically discovered skills. Skill names are opaque.
#[async_trait]
pub trait SkillProvider: Send + Sync {
  async fn list(&self) -> Result<Vec<SkillInfo>, DelegateError>;

  async fn execute(&self, name: &str, arguments: Value) -> Result<Value, DelegateError>;
}

/// Stands in for any collaborator that is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl Offline {
  fn unavailable<T>(what: &str) -> Result<T, DelegateError> {
    Err(DelegateError::Unavailable(format!("no {what} is configured")))
  }
}

#[async_trait]
impl Agent for Offline {
  async fn chat(&self, _message: &str) -> Result<String, DelegateError> {
    Self::unavailable("agent")
  }

  async fn status(&self) -> Result<Value, DelegateError> {
    Ok(json!({ "online": false }))
  }
}

#[async_trait]
impl MemoryStore for Offline {
  async fn save(&self, _content: &str, _tags: Vec<String>) -> Result<MemoryEntry, DelegateError> {
    Self::unavailable("memory store")
  }

  async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<MemoryEntry>, DelegateError> {
    Self::unavailable("memory store")
  }
}

#[async_trait]
impl SkillProvider for Offline {
  async fn list(&self) -> Result<Vec<SkillInfo>, DelegateError> {
    Ok(Vec::new())
  }

  async fn execute(&self, _name: &str, _arguments: Value) -> Result<Value, DelegateError> {
    Self::unavailable("skill provider")
  }
}
