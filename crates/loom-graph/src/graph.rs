use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::edge::Edge;

/// Graph structure for traversal and analysis.
///
/// Built over a chosen subset of a loom's yarns. Several yarns between the
/// same pair of nodes collapse into one adjacency entry.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> downstream node_ids, sorted.
  adjacency: BTreeMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> upstream node_ids, sorted.
  reverse_adjacency: BTreeMap<String, Vec<String>>,
  /// Nodes with no incoming edges, sorted.
  entry_points: Vec<String>,
}

impl Graph {
  /// Build a graph from node ids and the edges to include.
  pub fn new<'a>(
    node_ids: impl IntoIterator<Item = &'a String>,
    edges: impl IntoIterator<Item = &'a Edge>,
  ) -> Self {
    let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut reverse_adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();

    // Initialize all nodes
    for node_id in node_ids {
      adjacency.entry(node_id.clone()).or_default();
      reverse_adjacency.entry(node_id.clone()).or_default();
    }

    for edge in edges {
      adjacency
        .entry(edge.source.clone())
        .or_default()
        .push(edge.target.clone());
      reverse_adjacency
        .entry(edge.target.clone())
        .or_default()
        .push(edge.source.clone());
    }

    for list in adjacency.values_mut().chain(reverse_adjacency.values_mut()) {
      list.sort();
      list.dedup();
    }

    let entry_points = reverse_adjacency
      .iter()
      .filter(|(_, incoming)| incoming.is_empty())
      .map(|(id, _)| id.clone())
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Get entry points (nodes with no incoming edges).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// The adjacency list itself.
  pub fn adjacency(&self) -> &BTreeMap<String, Vec<String>> {
    &self.adjacency
  }

  /// Depth-first reachability check.
  pub fn reaches(&self, from: &str, to: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
      if current == to {
        return true;
      }
      if visited.insert(current) {
        stack.extend(self.downstream(current).iter().map(String::as_str));
      }
    }

    false
  }

  /// Kahn's algorithm, breaking ties by ascending node id.
  ///
  /// Returns `None` if the graph has a cycle.
  pub fn topological_order(&self) -> Option<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = self
      .reverse_adjacency
      .iter()
      .map(|(id, incoming)| (id.as_str(), incoming.len()))
      .collect();

    let mut ready: BTreeSet<&str> = in_degree
      .iter()
      .filter(|(_, deg)| **deg == 0)
      .map(|(id, _)| *id)
      .collect();

    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(node_id) = ready.pop_first() {
      order.push(node_id.to_string());
      for next in self.downstream(node_id) {
        if let Some(deg) = in_degree.get_mut(next.as_str()) {
          *deg -= 1;
          if *deg == 0 {
            ready.insert(next.as_str());
          }
        }
      }
    }

    (order.len() == in_degree.len()).then_some(order)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use loom_config::YarnKind;

  fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_diamond_order_breaks_ties_by_id() {
    let nodes = ids(&["d", "c", "b", "a"]);
    let edges = vec![
      Edge::new("a", "c", YarnKind::Data),
      Edge::new("a", "b", YarnKind::Data),
      Edge::new("b", "d", YarnKind::Data),
      Edge::new("c", "d", YarnKind::Signal),
    ];
    let graph = Graph::new(&nodes, &edges);

    assert_eq!(graph.entry_points(), ["a"]);
    assert_eq!(graph.upstream("d"), ["b", "c"]);
    assert_eq!(graph.topological_order().unwrap(), ids(&["a", "b", "c", "d"]));
  }

  #[test]
  fn test_parallel_kinds_collapse() {
    let nodes = ids(&["a", "b"]);
    let edges = vec![
      Edge::new("a", "b", YarnKind::Data),
      Edge::new("a", "b", YarnKind::State),
    ];
    let graph = Graph::new(&nodes, &edges);
    assert_eq!(graph.downstream("a"), ["b"]);
  }

  #[test]
  fn test_cycle_has_no_order() {
    let nodes = ids(&["a", "b"]);
    let edges = vec![
      Edge::new("a", "b", YarnKind::Data),
      Edge::new("b", "a", YarnKind::Data),
    ];
    let graph = Graph::new(&nodes, &edges);
    assert!(graph.reaches("b", "a"));
    assert!(graph.topological_order().is_none());
  }
}
