//! Capability provider interfaces consumed by the flow interpreter.
//!
//! Providers are injected into each execution, never owned by the engine.
//! Action nodes delegate their externally visible effects here: sending
//! messages, writing log entries. The key-value and outbound-HTTP surfaces
//! are reserved for future node kinds and currently empty.

mod capture;
mod error;

use std::sync::Arc;

use async_trait::async_trait;
use skein_flow::{InteractionResponse, LogLevel, Message, MessageData};

pub use capture::{CapturedLogEntry, CapturedResponse, CapturingLog, CapturingMessaging};
pub use error::ProviderError;

/// Message and interaction-response delivery.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
  async fn create_interaction_response(
    &self,
    interaction_id: &str,
    interaction_token: &str,
    response: InteractionResponse,
  ) -> Result<(), ProviderError>;

  async fn create_message(
    &self,
    channel_id: &str,
    data: MessageData,
  ) -> Result<Message, ProviderError>;
}

/// App-facing log sink for `action_log` nodes.
///
/// Fire-and-forget from the interpreter's perspective: failures are the
/// provider's own business and never fail the flow.
#[async_trait]
pub trait LogProvider: Send + Sync {
  async fn create_log_entry(&self, level: LogLevel, message: String);
}

/// Reserved for future key-value node kinds.
pub trait KvProvider: Send + Sync {}

/// Reserved for future outbound-HTTP node kinds.
pub trait HttpProvider: Send + Sync {}

/// The bundle of provider handles threaded through an execution.
#[derive(Clone)]
pub struct FlowProviders {
  pub messaging: Arc<dyn MessagingProvider>,
  pub log: Arc<dyn LogProvider>,
  pub kv: Option<Arc<dyn KvProvider>>,
  pub http: Option<Arc<dyn HttpProvider>>,
}

impl FlowProviders {
  pub fn new(messaging: Arc<dyn MessagingProvider>, log: Arc<dyn LogProvider>) -> Self {
    Self {
      messaging,
      log,
      kv: None,
      http: None,
    }
  }
}

/// Forwards flow log entries to the process `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingLogProvider;

#[async_trait]
impl LogProvider for TracingLogProvider {
  async fn create_log_entry(&self, level: LogLevel, message: String) {
    match level {
      LogLevel::Debug => tracing::debug!(target: "skein::flow", "{message}"),
      LogLevel::Info => tracing::info!(target: "skein::flow", "{message}"),
      LogLevel::Warn => tracing::warn!(target: "skein::flow", "{message}"),
      LogLevel::Error => tracing::error!(target: "skein::flow", "{message}"),
    }
  }
}
