//! Integration tests for graph compilation.

use serde_json::json;
use skein_engine::{CompileError, compile_command, compile_event};
use skein_flow::{FlowGraph, NodeKind};

fn graph(value: serde_json::Value) -> FlowGraph {
  serde_json::from_value(value).expect("test graph should deserialize")
}

/// A command entry fanning out to two log actions.
fn two_branch_graph() -> FlowGraph {
  graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_command", "data": {"name": "ping", "description": "Pings the bot"}},
      {"id": "1", "type": "action_log", "data": {"log_message": "first"}},
      {"id": "2", "type": "action_log", "data": {"log_message": "second"}}
    ],
    "edges": [
      {"id": "e1", "source": "0", "target": "1"},
      {"id": "e2", "source": "0", "target": "2"}
    ]
  }))
}

#[test]
fn compiles_command_graph() {
  let flow = compile_command(&two_branch_graph()).unwrap();

  assert_eq!(flow.len(), 3);
  assert_eq!(flow.entry().id, "0");
  assert_eq!(flow.command_name(), Some("ping"));
  assert_eq!(flow.command_description(), Some("Pings the bot"));
  assert_eq!(flow.event_type(), None);
}

#[test]
fn edge_order_defines_child_order() {
  let flow = compile_command(&two_branch_graph()).unwrap();

  let children: Vec<&str> = flow
    .children(flow.entry())
    .map(|child| child.id.as_str())
    .collect();
  assert_eq!(children, vec!["1", "2"]);
}

#[test]
fn compilation_is_deterministic() {
  let graph = two_branch_graph();
  let first = compile_command(&graph).unwrap();
  let second = compile_command(&graph).unwrap();
  assert_eq!(first, second);
}

#[test]
fn missing_entry_is_rejected() {
  let orphan = graph(json!({
    "nodes": [{"id": "1", "type": "action_log", "data": {"log_message": "hi"}}],
    "edges": []
  }));

  assert!(matches!(
    compile_command(&orphan),
    Err(CompileError::NoEntryNode {
      entry: NodeKind::EntryCommand
    })
  ));
}

#[test]
fn second_entry_is_rejected() {
  let doubled = graph(json!({
    "nodes": [
      {"id": "a", "type": "entry_command", "data": {"name": "one"}},
      {"id": "b", "type": "entry_command", "data": {"name": "two"}}
    ],
    "edges": []
  }));

  match compile_command(&doubled) {
    Err(CompileError::DuplicateEntryNode { first, second }) => {
      assert_eq!(first, "a");
      assert_eq!(second, "b");
    }
    other => panic!("expected duplicate entry error, got {other:?}"),
  }
}

#[test]
fn duplicate_node_id_is_rejected() {
  let doubled = graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_command", "data": {"name": "ping"}},
      {"id": "0", "type": "action_log", "data": {"log_message": "hi"}}
    ],
    "edges": []
  }));

  assert!(matches!(
    compile_command(&doubled),
    Err(CompileError::DuplicateNodeId { id }) if id == "0"
  ));
}

#[test]
fn dangling_edge_is_rejected() {
  let dangling = graph(json!({
    "nodes": [{"id": "0", "type": "entry_command", "data": {"name": "ping"}}],
    "edges": [{"id": "e9", "source": "0", "target": "ghost"}]
  }));

  match compile_command(&dangling) {
    Err(CompileError::DanglingEdge { edge_id, node_id }) => {
      assert_eq!(edge_id, "e9");
      assert_eq!(node_id, "ghost");
    }
    other => panic!("expected dangling edge error, got {other:?}"),
  }
}

#[test]
fn cycle_is_rejected() {
  let cyclic = graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_command", "data": {"name": "ping"}},
      {"id": "1", "type": "action_log", "data": {"log_message": "a"}},
      {"id": "2", "type": "action_log", "data": {"log_message": "b"}}
    ],
    "edges": [
      {"id": "e1", "source": "0", "target": "1"},
      {"id": "e2", "source": "1", "target": "2"},
      {"id": "e3", "source": "2", "target": "1"}
    ]
  }));

  assert!(matches!(
    compile_command(&cyclic),
    Err(CompileError::CycleDetected { .. })
  ));
}

#[test]
fn self_loop_is_rejected() {
  let looped = graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_command", "data": {"name": "ping"}},
      {"id": "1", "type": "action_log", "data": {"log_message": "a"}}
    ],
    "edges": [
      {"id": "e1", "source": "0", "target": "1"},
      {"id": "e2", "source": "1", "target": "1"}
    ]
  }));

  assert!(matches!(
    compile_command(&looped),
    Err(CompileError::CycleDetected { node_id }) if node_id == "1"
  ));
}

#[test]
fn command_options_read_from_entry_parents() {
  let with_options = graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_command", "data": {"name": "greet"}},
      {"id": "opt", "type": "option_command_text", "data": {"name": "who", "description": "Who to greet"}},
      {"id": "1", "type": "action_log", "data": {"log_message": "hi"}}
    ],
    "edges": [
      {"id": "e1", "source": "opt", "target": "0"},
      {"id": "e2", "source": "0", "target": "1"}
    ]
  }));

  let flow = compile_command(&with_options).unwrap();
  let options = flow.command_options();
  assert_eq!(options.len(), 1);
  assert_eq!(options[0].name, "who");
  assert_eq!(options[0].description, "Who to greet");
  assert!(options[0].required);

  let opt_node = flow
    .parent_with_kind(flow.entry(), NodeKind::OptionCommandText)
    .unwrap();
  assert_eq!(opt_node.id, "opt");
}

#[test]
fn compiles_event_graph() {
  let listener = graph(json!({
    "nodes": [
      {"id": "0", "type": "entry_event", "data": {"event_type": "message_create"}},
      {"id": "1", "type": "action_log", "data": {"log_message": "seen"}}
    ],
    "edges": [{"id": "e1", "source": "0", "target": "1"}]
  }));

  let flow = compile_event(&listener).unwrap();
  assert_eq!(flow.event_type(), Some("message_create"));
  assert_eq!(flow.command_name(), None);
}
