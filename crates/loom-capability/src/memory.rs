use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::delegate::{DelegateError, MemoryEntry, MemoryStore};

/// Process-local memory with keyword search.
///
/// An entry scores one point per distinct query word found in its content,
/// case-insensitively. Entries scoring zero are not returned; ties keep
/// insertion order.
#[derive(Debug, Default)]
pub struct InMemoryMemory {
  entries: RwLock<Vec<MemoryEntry>>,
}

impl InMemoryMemory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
  async fn save(&self, content: &str, tags: Vec<String>) -> Result<MemoryEntry, DelegateError> {
    let entry = MemoryEntry {
      memory_id: uuid::Uuid::new_v4().to_string(),
      content: content.to_string(),
      tags,
      created_at: Utc::now(),
    };
    self
      .entries
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .push(entry.clone());
    Ok(entry)
  }

  async fn search(&self, query: &str, max_results: usize) -> Result<Vec<MemoryEntry>, DelegateError> {
    let query = query.to_lowercase();
    let mut words: Vec<&str> = query.split_whitespace().collect();
    words.sort_unstable();
    words.dedup();

    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    let mut scored: Vec<(usize, &MemoryEntry)> = entries
      .iter()
      .filter_map(|entry| {
        let content = entry.content.to_lowercase();
        let score = words.iter().filter(|w| content.contains(*w)).count();
        (score > 0).then_some((score, entry))
      })
      .collect();
    // stable: equal scores stay in insertion order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(
      scored
        .into_iter()
        .take(max_results)
        .map(|(_, entry)| entry.clone())
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_keyword_search_ranks_by_matches() {
    let memory = InMemoryMemory::new();
    memory.save("Morning ritual: coffee then email", vec![]).await.unwrap();
    memory.save("Buy coffee beans", vec!["errand".into()]).await.unwrap();
    memory.save("Quarterly report due", vec![]).await.unwrap();

    let hits = memory.search("morning COFFEE", 5).await.unwrap();
    let contents: Vec<_> = hits.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["Morning ritual: coffee then email", "Buy coffee beans"]);

    let hits = memory.search("coffee", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "Morning ritual: coffee then email");

    assert!(memory.search("nothing here", 5).await.unwrap().is_empty());
    assert_eq!(memory.len(), 3);
  }
}
