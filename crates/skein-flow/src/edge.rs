use serde::{Deserialize, Serialize};

/// A directed connection between two nodes in the authored graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
  pub id: String,
  pub source: String,
  pub target: String,
}
