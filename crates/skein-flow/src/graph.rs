use serde::{Deserialize, Serialize};

use crate::edge::FlowEdge;
use crate::node::{FlowNode, NodeKind};

/// The persisted form of a flow: a flat node/edge list, exactly as stored
/// and edited externally. Immutable after parse; all structural validation
/// happens in the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
  pub nodes: Vec<FlowNode>,
  pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
  /// Command name read off the `entry_command` node, if any.
  ///
  /// Convenience for callers that need the name before compiling, e.g.
  /// for command registration.
  pub fn command_name(&self) -> Option<&str> {
    self
      .nodes
      .iter()
      .find(|n| n.kind == NodeKind::EntryCommand)
      .map(|n| n.data.name.as_str())
  }

  pub fn command_description(&self) -> Option<&str> {
    self
      .nodes
      .iter()
      .find(|n| n.kind == NodeKind::EntryCommand)
      .map(|n| n.data.description.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn graph_parses_from_editor_json() {
    let graph: FlowGraph = serde_json::from_str(
      r#"{
        "nodes": [
          {"id": "0", "type": "entry_command", "data": {"name": "ping", "description": "Pong!"}, "position": {"x": 1.0, "y": 2.0}},
          {"id": "1", "type": "action_log", "data": {"log_level": "warn", "log_message": "pong"}}
        ],
        "edges": [
          {"id": "e1", "source": "0", "target": "1"}
        ]
      }"#,
    )
    .unwrap();

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.command_name(), Some("ping"));
    assert_eq!(graph.command_description(), Some("Pong!"));
  }

  #[test]
  fn command_name_absent_for_event_flows() {
    let graph: FlowGraph = serde_json::from_str(
      r#"{"nodes": [{"id": "0", "type": "entry_event", "data": {"event_type": "message_create"}}], "edges": []}"#,
    )
    .unwrap();
    assert_eq!(graph.command_name(), None);
  }
}
