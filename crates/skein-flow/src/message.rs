use serde::{Deserialize, Serialize};

/// Message payload authored on action nodes and sent through the
/// messaging provider. Content may contain `{{ ... }}` template
/// expressions which are resolved at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
  #[serde(default)]
  pub content: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub embeds: Vec<Embed>,
}

impl MessageData {
  pub fn is_empty(&self) -> bool {
    self.content.is_empty() && self.embeds.is_empty()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub title: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default)]
  pub color: u32,
}

/// A message as returned by the messaging provider.
///
/// Snowflake IDs are carried as strings end to end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id: String,
  pub channel_id: String,
  #[serde(default)]
  pub content: String,
}

/// The interaction a command invocation originated from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
  pub id: String,
  pub token: String,
}

/// Response payload for `create_interaction_response`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
  pub content: String,
  #[serde(default)]
  pub ephemeral: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub embeds: Vec<Embed>,
}
