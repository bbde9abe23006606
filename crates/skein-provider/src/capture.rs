//! In-memory providers that record every call.
//!
//! Used as test doubles and by the CLI to show what a flow would send.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use skein_flow::{InteractionResponse, LogLevel, Message, MessageData};

use crate::{LogProvider, MessagingProvider, ProviderError};

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResponse {
  pub interaction_id: String,
  pub interaction_token: String,
  pub response: InteractionResponse,
}

/// Messaging provider that records calls and fabricates sent messages.
#[derive(Debug, Default)]
pub struct CapturingMessaging {
  next_id: AtomicU64,
  pub responses: Mutex<Vec<CapturedResponse>>,
  pub messages: Mutex<Vec<Message>>,
}

impl CapturingMessaging {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl MessagingProvider for CapturingMessaging {
  async fn create_interaction_response(
    &self,
    interaction_id: &str,
    interaction_token: &str,
    response: InteractionResponse,
  ) -> Result<(), ProviderError> {
    self.responses.lock().unwrap().push(CapturedResponse {
      interaction_id: interaction_id.to_string(),
      interaction_token: interaction_token.to_string(),
      response,
    });
    Ok(())
  }

  async fn create_message(
    &self,
    channel_id: &str,
    data: MessageData,
  ) -> Result<Message, ProviderError> {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    let message = Message {
      id: id.to_string(),
      channel_id: channel_id.to_string(),
      content: data.content,
    };
    self.messages.lock().unwrap().push(message.clone());
    Ok(message)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedLogEntry {
  pub level: LogLevel,
  pub message: String,
}

/// Log provider that records entries instead of persisting them.
#[derive(Debug, Default)]
pub struct CapturingLog {
  pub entries: Mutex<Vec<CapturedLogEntry>>,
}

impl CapturingLog {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl LogProvider for CapturingLog {
  async fn create_log_entry(&self, level: LogLevel, message: String) {
    self
      .entries
      .lock()
      .unwrap()
      .push(CapturedLogEntry { level, message });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn capturing_messaging_records_calls() {
    let messaging = CapturingMessaging::new();

    messaging
      .create_interaction_response(
        "10",
        "token",
        InteractionResponse {
          content: "Pong!".into(),
          ephemeral: true,
          embeds: vec![],
        },
      )
      .await
      .unwrap();

    let msg = messaging
      .create_message(
        "55",
        MessageData {
          content: "hello".into(),
          embeds: vec![],
        },
      )
      .await
      .unwrap();

    assert_eq!(msg.channel_id, "55");
    assert_eq!(msg.content, "hello");
    assert_eq!(messaging.responses.lock().unwrap().len(), 1);
    assert_eq!(messaging.messages.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn capturing_log_records_entries() {
    let log = CapturingLog::new();
    log.create_log_entry(LogLevel::Warn, "careful".into()).await;

    let entries = log.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Warn);
    assert_eq!(entries[0].message, "careful");
  }
}
