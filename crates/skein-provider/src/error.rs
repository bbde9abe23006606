use thiserror::Error;

/// Errors surfaced by capability providers.
///
/// Provider failures are fatal to the execution that triggered them and
/// are not retried inside the engine; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("not found")]
  NotFound,

  /// The Discord API rejected the request or was unreachable.
  #[error("discord request failed: {message}")]
  Discord { message: String },

  /// The provider returned a non-success status.
  #[error("request failed with status {status}")]
  Response { status: u16 },
}

impl ProviderError {
  pub fn discord(message: impl Into<String>) -> Self {
    Self::Discord {
      message: message.into(),
    }
  }
}
