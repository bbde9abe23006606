//! Links a flat node/edge graph into an executable tree.
//!
//! Compilation is a pure function of the graph: the same input always
//! yields the same tree shape. The result is immutable and shared
//! read-only across concurrent executions; a redefined flow is recompiled
//! and swapped wholesale, never patched in place.

use std::collections::HashMap;

use skein_flow::{FlowGraph, NodeData, NodeKind};

use crate::error::CompileError;

/// A node in the compiled tree. Adjacency is index-based into the owning
/// [`CompiledFlow`] arena.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledNode {
  pub id: String,
  pub kind: NodeKind,
  pub data: NodeData,
  pub(crate) parents: Vec<usize>,
  pub(crate) children: Vec<usize>,
}

/// A validated, linked flow rooted at its entry node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFlow {
  nodes: Vec<CompiledNode>,
  entry: usize,
}

/// A command option synthesized from an option-typed parent of the entry
/// node. All options are currently surfaced as required text options;
/// typed descriptors for the other option kinds are a future extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
  pub name: String,
  pub description: String,
  pub required: bool,
}

pub fn compile_command(graph: &FlowGraph) -> Result<CompiledFlow, CompileError> {
  compile(graph, NodeKind::EntryCommand)
}

pub fn compile_event(graph: &FlowGraph) -> Result<CompiledFlow, CompileError> {
  compile(graph, NodeKind::EntryEvent)
}

/// Compile a graph, selecting the unique node of `entry_kind` as the root.
pub fn compile(graph: &FlowGraph, entry_kind: NodeKind) -> Result<CompiledFlow, CompileError> {
  let mut nodes = Vec::with_capacity(graph.nodes.len());
  let mut index: HashMap<&str, usize> = HashMap::with_capacity(graph.nodes.len());
  let mut entry: Option<usize> = None;

  for node in &graph.nodes {
    if index.contains_key(node.id.as_str()) {
      return Err(CompileError::DuplicateNodeId {
        id: node.id.clone(),
      });
    }

    let idx = nodes.len();
    index.insert(node.id.as_str(), idx);
    nodes.push(CompiledNode {
      id: node.id.clone(),
      kind: node.kind,
      data: node.data.clone(),
      parents: Vec::new(),
      children: Vec::new(),
    });

    if node.kind == entry_kind {
      match entry {
        None => entry = Some(idx),
        Some(first) => {
          return Err(CompileError::DuplicateEntryNode {
            first: nodes[first].id.clone(),
            second: node.id.clone(),
          });
        }
      }
    }
  }

  let entry = entry.ok_or(CompileError::NoEntryNode { entry: entry_kind })?;

  // Edge order defines child execution order.
  for edge in &graph.edges {
    let source = *index
      .get(edge.source.as_str())
      .ok_or_else(|| CompileError::DanglingEdge {
        edge_id: edge.id.clone(),
        node_id: edge.source.clone(),
      })?;
    let target = *index
      .get(edge.target.as_str())
      .ok_or_else(|| CompileError::DanglingEdge {
        edge_id: edge.id.clone(),
        node_id: edge.target.clone(),
      })?;

    nodes[source].children.push(target);
    nodes[target].parents.push(source);
  }

  detect_cycles(&nodes)?;

  Ok(CompiledFlow { nodes, entry })
}

/// Three-state DFS over the whole arena. Quotas would eventually stop a
/// cyclic execution, but an authored cycle is a graph defect and is
/// rejected up front.
fn detect_cycles(nodes: &[CompiledNode]) -> Result<(), CompileError> {
  #[derive(Clone, Copy, PartialEq)]
  enum Mark {
    Unvisited,
    InProgress,
    Done,
  }

  let mut marks = vec![Mark::Unvisited; nodes.len()];

  for start in 0..nodes.len() {
    if marks[start] != Mark::Unvisited {
      continue;
    }

    let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
    marks[start] = Mark::InProgress;

    while let Some(frame) = stack.last_mut() {
      let node = frame.0;
      if frame.1 < nodes[node].children.len() {
        let child = nodes[node].children[frame.1];
        frame.1 += 1;
        match marks[child] {
          Mark::InProgress => {
            return Err(CompileError::CycleDetected {
              node_id: nodes[child].id.clone(),
            });
          }
          Mark::Unvisited => {
            marks[child] = Mark::InProgress;
            stack.push((child, 0));
          }
          Mark::Done => {}
        }
      } else {
        marks[node] = Mark::Done;
        stack.pop();
      }
    }
  }

  Ok(())
}

impl CompiledFlow {
  pub fn entry(&self) -> &CompiledNode {
    &self.nodes[self.entry]
  }

  pub(crate) fn node(&self, idx: usize) -> &CompiledNode {
    &self.nodes[idx]
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn children<'a>(&'a self, node: &'a CompiledNode) -> impl Iterator<Item = &'a CompiledNode> {
    node.children.iter().map(|&idx| &self.nodes[idx])
  }

  pub fn parents<'a>(&'a self, node: &'a CompiledNode) -> impl Iterator<Item = &'a CompiledNode> {
    node.parents.iter().map(|&idx| &self.nodes[idx])
  }

  /// Command name read off the entry node, when this is a command flow.
  pub fn command_name(&self) -> Option<&str> {
    let entry = self.entry();
    entry
      .kind
      .is_command_entry()
      .then_some(entry.data.name.as_str())
  }

  pub fn command_description(&self) -> Option<&str> {
    let entry = self.entry();
    entry
      .kind
      .is_command_entry()
      .then_some(entry.data.description.as_str())
  }

  /// Event type read off the entry node, when this is an event flow.
  pub fn event_type(&self) -> Option<&str> {
    let entry = self.entry();
    (entry.kind == NodeKind::EntryEvent).then_some(entry.data.event_type.as_str())
  }

  /// Options declared for this command.
  ///
  /// Option nodes point into the entry node in the authoring graph, so
  /// this scans the entry's parents rather than its children.
  pub fn command_options(&self) -> Vec<CommandOption> {
    self
      .parents(self.entry())
      .filter(|parent| parent.kind.is_command_option())
      .map(|parent| CommandOption {
        name: parent.data.name.clone(),
        description: parent.data.description.clone(),
        required: true,
      })
      .collect()
  }

  /// First parent of `node` with the given kind. Used when an action
  /// needs configuration contributed by a sibling node.
  pub fn parent_with_kind<'a>(
    &'a self,
    node: &'a CompiledNode,
    kind: NodeKind,
  ) -> Option<&'a CompiledNode> {
    self.parents(node).find(|parent| parent.kind == kind)
  }
}
