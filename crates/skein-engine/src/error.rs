//! Compile- and run-time error taxonomies.

use skein_flow::NodeKind;
use skein_provider::ProviderError;
use thiserror::Error;

/// Errors produced while linking a flow graph into a tree.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("no entry node of type {entry:?} found")]
  NoEntryNode { entry: NodeKind },

  #[error("duplicate entry node: '{first}' and '{second}'")]
  DuplicateEntryNode { first: String, second: String },

  #[error("duplicate node id: '{id}'")]
  DuplicateNodeId { id: String },

  #[error("edge '{edge_id}' references unknown node '{node_id}'")]
  DanglingEdge { edge_id: String, node_id: String },

  #[error("cycle detected at node '{node_id}'")]
  CycleDetected { node_id: String },
}

/// Errors produced while interpreting a compiled tree.
///
/// Quota breaches are always fatal to the current execution and never
/// retried. Every node-level failure is wrapped in `Node` with the
/// originating node's ID before propagating, so callers can report which
/// node failed without re-walking the tree.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("max stack depth reached: {limit}")]
  MaxStackDepthReached { limit: usize },

  #[error("operations limit exceeded: {limit}")]
  MaxOperationsReached { limit: usize },

  #[error("actions limit exceeded: {limit}")]
  MaxActionsReached { limit: usize },

  /// The compiled tree contains a node kind execution cannot dispatch.
  /// Indicates a compiler or versioning defect, not a user error.
  #[error("unknown node type: {kind:?}")]
  UnknownNodeType { kind: NodeKind },

  #[error("interaction is nil")]
  MissingInteraction,

  #[error("execution cancelled")]
  Cancelled,

  #[error("template resolution failed: {message}")]
  Template { message: String },

  #[error(transparent)]
  Provider(#[from] ProviderError),

  #[error("node '{node_id}': {source}")]
  Node {
    node_id: String,
    #[source]
    source: Box<FlowError>,
  },
}

impl FlowError {
  /// Wrap an error with the identity of the node it originated from.
  pub(crate) fn trace(node_id: &str, source: FlowError) -> FlowError {
    FlowError::Node {
      node_id: node_id.to_string(),
      source: Box::new(source),
    }
  }

  /// The innermost error beneath any node-trace wrappers.
  pub fn origin(&self) -> &FlowError {
    match self {
      FlowError::Node { source, .. } => source.origin(),
      other => other,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn origin_unwraps_nested_traces() {
    let err = FlowError::trace(
      "0",
      FlowError::trace("1", FlowError::MaxActionsReached { limit: 1 }),
    );
    assert!(matches!(
      err.origin(),
      FlowError::MaxActionsReached { limit: 1 }
    ));
    assert_eq!(
      err.to_string(),
      "node '0': node '1': actions limit exceeded: 1"
    );
  }
}
