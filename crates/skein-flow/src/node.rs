use serde::{Deserialize, Serialize};

use crate::message::MessageData;
use crate::value::FlowValue;

/// The closed set of node kinds understood by the engine.
///
/// Extending behavior means adding a case here and teaching the
/// interpreter about it; anything the interpreter does not handle fails
/// execution with an unknown-node-type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  EntryCommand,
  EntryEvent,
  ActionResponseCreate,
  ActionMessageCreate,
  ActionLog,
  ConditionCompare,
  ConditionItemCompare,
  ConditionItemElse,
  OptionCommandText,
  OptionCommandNumber,
  OptionCommandUser,
  OptionCommandChannel,
  OptionCommandRole,
  OptionCommandAttachment,
}

impl NodeKind {
  pub fn is_entry(self) -> bool {
    matches!(self, NodeKind::EntryCommand | NodeKind::EntryEvent)
  }

  pub fn is_command_entry(self) -> bool {
    self == NodeKind::EntryCommand
  }

  pub fn is_action(self) -> bool {
    matches!(
      self,
      NodeKind::ActionResponseCreate | NodeKind::ActionMessageCreate | NodeKind::ActionLog
    )
  }

  pub fn is_command_option(self) -> bool {
    matches!(
      self,
      NodeKind::OptionCommandText
        | NodeKind::OptionCommandNumber
        | NodeKind::OptionCommandUser
        | NodeKind::OptionCommandChannel
        | NodeKind::OptionCommandRole
        | NodeKind::OptionCommandAttachment
    )
  }
}

/// Severity for `action_log` nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Debug,
  #[default]
  Info,
  Warn,
  Error,
}

/// Comparator configured on a `condition_item_compare` node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
  #[default]
  Equal,
  NotEqual,
  GreaterThan,
  GreaterThanOrEqual,
  LessThan,
  LessThanOrEqual,
  Contains,
}

/// Per-node configuration authored in the editor.
///
/// This is a flat bag of optional fields; which ones are meaningful
/// depends on the node kind. Unused fields stay at their defaults and are
/// skipped when serializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub custom_label: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub event_type: String,

  #[serde(default, skip_serializing_if = "MessageData::is_empty")]
  pub message_data: MessageData,
  #[serde(default)]
  pub message_ephemeral: bool,

  #[serde(default)]
  pub log_level: LogLevel,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub log_message: String,

  #[serde(default)]
  pub condition_base_value: FlowValue,
  #[serde(default)]
  pub condition_allow_multiple: bool,
  #[serde(default)]
  pub condition_item_mode: CompareMode,
  #[serde(default)]
  pub condition_item_value: FlowValue,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub result_variable_name: String,
}

/// Editor canvas position. Carried through serialization untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
  pub x: f64,
  pub y: f64,
}

/// A typed unit of behavior in a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: NodeKind,
  #[serde(default)]
  pub data: NodeData,
  #[serde(default)]
  pub position: NodePosition,
}
