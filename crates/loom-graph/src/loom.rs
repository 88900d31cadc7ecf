use std::collections::{BTreeMap, BTreeSet, HashMap};

use loom_config::{LoomDef, NodeKind, Position, YarnKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::{Edge, EdgeClass};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;

/// Read-only view of a loom's wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
  /// node_id -> downstream node_ids over every yarn kind. Every node is a key.
  pub adjacency: BTreeMap<String, Vec<String>>,
  /// Every yarn with its kind.
  pub edges: Vec<Edge>,
}

/// A named graph of nodes and yarns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loom {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  nodes: HashMap<String, Node>,
  edges: BTreeSet<Edge>,
}

impl Loom {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: None,
      nodes: HashMap::new(),
      edges: BTreeSet::new(),
    }
  }

  /// Build a loom from a definition, enforcing every invariant.
  pub fn from_def(def: LoomDef) -> Result<Self, GraphError> {
    let mut loom = Loom::new(def.name);
    loom.description = def.description;

    for node_def in def.nodes {
      loom.insert_node(Node::from(node_def))?;
    }
    for edge in def.edges {
      loom.connect(&edge.source, &edge.target, edge.kind)?;
    }

    Ok(loom)
  }

  pub fn to_def(&self) -> LoomDef {
    let mut nodes: Vec<_> = self.nodes.values().map(Node::to_def).collect();
    nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));

    LoomDef {
      name: self.name.clone(),
      description: self.description.clone(),
      nodes,
      edges: self.edges.iter().map(Edge::to_def).collect(),
    }
  }

  /// Create an idle node and return its id.
  pub fn add_node(
    &mut self,
    name: impl Into<String>,
    kind: NodeKind,
    position: Option<Position>,
  ) -> String {
    let node = Node::new(name, kind).with_position(position);
    let node_id = node.node_id.clone();
    self.nodes.insert(node_id.clone(), node);
    node_id
  }

  /// Insert a node that already carries an id.
  pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
    if node.node_id.trim().is_empty() {
      return Err(GraphError::Validation("node id must not be empty".to_string()));
    }
    if self.nodes.contains_key(&node.node_id) {
      return Err(GraphError::DuplicateNode(node.node_id));
    }
    self.nodes.insert(node.node_id.clone(), node);
    Ok(())
  }

  /// Connect two nodes.
  ///
  /// Returns `false` if the yarn already existed.
  pub fn connect(&mut self, source: &str, target: &str, kind: YarnKind) -> Result<bool, GraphError> {
    for id in [source, target] {
      if !self.nodes.contains_key(id) {
        return Err(GraphError::NodeNotFound(id.to_string()));
      }
    }

    let edge = Edge::new(source, target, kind);
    if self.edges.contains(&edge) {
      return Ok(false);
    }

    if self.would_create_cycle(source, target, kind) {
      return Err(GraphError::Cycle {
        from: source.to_string(),
        to: target.to_string(),
        kind,
      });
    }

    self.edges.insert(edge);
    Ok(true)
  }

  /// Remove a yarn. Returns `false` if it did not exist.
  pub fn disconnect(&mut self, source: &str, target: &str, kind: YarnKind) -> Result<bool, GraphError> {
    for id in [source, target] {
      if !self.nodes.contains_key(id) {
        return Err(GraphError::NodeNotFound(id.to_string()));
      }
    }
    Ok(self.edges.remove(&Edge::new(source, target, kind)))
  }

  /// Remove a node and every yarn touching it.
  pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
    let node = self
      .nodes
      .remove(node_id)
      .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
    self.edges.retain(|edge| !edge.touches(node_id));
    Ok(node)
  }

  /// Replace a node's kind-specific payload.
  pub fn set_payload(&mut self, node_id: &str, payload: Value) -> Result<(), GraphError> {
    let node = self
      .nodes
      .get_mut(node_id)
      .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
    node.kind = node.kind.with_payload(payload);
    Ok(())
  }

  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.get(node_id)
  }

  pub fn get_node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
    self.nodes.get_mut(node_id)
  }

  pub fn nodes(&self) -> impl Iterator<Item = &Node> {
    self.nodes.values()
  }

  pub fn edges(&self) -> impl Iterator<Item = &Edge> {
    self.edges.iter()
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn edge_count(&self) -> usize {
    self.edges.len()
  }

  /// Return every node to `idle` with no recorded output.
  pub fn reset_statuses(&mut self) {
    for node in self.nodes.values_mut() {
      node.reset();
    }
  }

  /// Graph over the yarns of one class.
  pub fn graph(&self, class: EdgeClass) -> Graph {
    Graph::new(
      self.nodes.keys(),
      self.edges.iter().filter(|edge| edge.class() == class),
    )
  }

  /// Graph over every yarn.
  pub fn full_graph(&self) -> Graph {
    Graph::new(self.nodes.keys(), self.edges.iter())
  }

  pub fn topology(&self) -> Topology {
    Topology {
      adjacency: self.full_graph().adjacency().clone(),
      edges: self.edges.iter().cloned().collect(),
    }
  }

  /// Guard yarns pointing at `node_id`.
  pub fn incoming_guards(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
    self
      .edges
      .iter()
      .filter(move |edge| edge.kind.is_guard() && edge.target == node_id)
  }

  /// Order in which a weave visits nodes.
  ///
  /// The order respects every data, signal and state yarn, with ties broken
  /// by ascending node id. Guard yarns are honoured too when doing so keeps
  /// the combined graph acyclic.
  pub fn execution_order(&self) -> Vec<String> {
    if let Some(order) = self.full_graph().topological_order() {
      return order;
    }
    // connect() keeps the flow graph acyclic, so this always succeeds
    self
      .graph(EdgeClass::Flow)
      .topological_order()
      .unwrap_or_default()
  }

  /// Would `source -> target` close a cycle among yarns of the same class?
  fn would_create_cycle(&self, source: &str, target: &str, kind: YarnKind) -> bool {
    source == target || self.graph(EdgeClass::of(kind)).reaches(target, source)
  }
}
