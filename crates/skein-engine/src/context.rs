//! Per-invocation execution state.
//!
//! An `ExecutionContext` is created for exactly one execution, owned by
//! it, and destroyed when it returns. Nothing escapes it except side
//! effects already committed through providers.

use std::collections::HashMap;
use std::sync::Arc;

use skein_flow::{FlowValue, Interaction};
use skein_provider::FlowProviders;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::FlowError;

/// Per-invocation resource ceilings, typically derived from the owning
/// app's plan or tier.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
  pub max_stack_depth: usize,
  pub max_operations: usize,
  pub max_actions: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_stack_depth: 64,
      max_operations: 1000,
      max_actions: 10,
    }
  }
}

/// Read-only view of the triggering event.
pub trait ContextData: Send + Sync {
  /// The interaction a command invocation originated from, if any.
  fn interaction(&self) -> Option<&Interaction> {
    None
  }

  fn guild_id(&self) -> Option<&str> {
    None
  }

  fn channel_id(&self) -> Option<&str> {
    None
  }

  /// Invoked command name, for dispatch matching.
  fn command_name(&self) -> Option<&str> {
    None
  }

  /// Gateway event type, for dispatch matching.
  fn event_type(&self) -> Option<&str> {
    None
  }

  /// Contextual accessors exposed to template expressions: user, member,
  /// guild, channel, command, attachment.
  fn template_env(&self) -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
  }
}

/// Plain-struct `ContextData` used by dispatchers and tests.
#[derive(Debug, Clone, Default)]
pub struct EventData {
  pub interaction: Option<Interaction>,
  pub guild_id: Option<String>,
  pub channel_id: Option<String>,
  pub command_name: Option<String>,
  pub event_type: Option<String>,
  pub env: serde_json::Value,
}

impl ContextData for EventData {
  fn interaction(&self) -> Option<&Interaction> {
    self.interaction.as_ref()
  }

  fn guild_id(&self) -> Option<&str> {
    self.guild_id.as_deref()
  }

  fn channel_id(&self) -> Option<&str> {
    self.channel_id.as_deref()
  }

  fn command_name(&self) -> Option<&str> {
    self.command_name.as_deref()
  }

  fn event_type(&self) -> Option<&str> {
    self.event_type.as_deref()
  }

  fn template_env(&self) -> serde_json::Value {
    self.env.clone()
  }
}

/// Temporaries for one `condition_compare` evaluation. Scoped as a stack
/// so nested conditions save and restore correctly.
#[derive(Debug, Clone)]
pub(crate) struct ConditionScope {
  pub base_value: FlowValue,
  pub allow_multiple: bool,
  pub item_met: bool,
}

/// Mutable state threaded through every interpretation step of a single
/// execution.
pub struct ExecutionContext {
  pub(crate) cancel: CancellationToken,
  pub data: Arc<dyn ContextData>,
  pub providers: FlowProviders,
  pub variables: HashMap<String, FlowValue>,

  limits: Limits,
  stack_depth: usize,
  operations: usize,
  actions: usize,
  conditions: Vec<ConditionScope>,
  pub(crate) background: Vec<JoinHandle<()>>,
}

impl ExecutionContext {
  pub fn new(
    cancel: CancellationToken,
    data: Arc<dyn ContextData>,
    providers: FlowProviders,
    limits: Limits,
  ) -> Self {
    Self {
      cancel,
      data,
      providers,
      variables: HashMap::new(),
      limits,
      stack_depth: 0,
      operations: 0,
      actions: 0,
      conditions: Vec::new(),
      background: Vec::new(),
    }
  }

  /// Called before interpreting any node. Checks cancellation first, then
  /// charges stack depth and the operation budget. Must be paired with
  /// [`end_operation`](Self::end_operation) on every exit path.
  pub(crate) fn start_operation(&mut self) -> Result<(), FlowError> {
    if self.cancel.is_cancelled() {
      return Err(FlowError::Cancelled);
    }

    self.stack_depth += 1;
    if self.stack_depth > self.limits.max_stack_depth {
      // A failed charge is released here; end_operation only runs for
      // nodes that actually started.
      self.stack_depth -= 1;
      return Err(FlowError::MaxStackDepthReached {
        limit: self.limits.max_stack_depth,
      });
    }

    self.operations += 1;
    if self.operations > self.limits.max_operations {
      self.stack_depth -= 1;
      return Err(FlowError::MaxOperationsReached {
        limit: self.limits.max_operations,
      });
    }

    Ok(())
  }

  /// Releases stack depth only; the operation count is cumulative.
  pub(crate) fn end_operation(&mut self) {
    self.stack_depth = self.stack_depth.saturating_sub(1);
  }

  /// Charged once per action-kind node, before any provider work.
  pub(crate) fn start_action(&mut self) -> Result<(), FlowError> {
    self.actions += 1;
    if self.actions > self.limits.max_actions {
      return Err(FlowError::MaxActionsReached {
        limit: self.limits.max_actions,
      });
    }
    Ok(())
  }

  pub(crate) fn push_condition(&mut self, base_value: FlowValue, allow_multiple: bool) {
    self.conditions.push(ConditionScope {
      base_value,
      allow_multiple,
      item_met: false,
    });
  }

  pub(crate) fn pop_condition(&mut self) {
    self.conditions.pop();
  }

  pub(crate) fn condition(&self) -> Option<&ConditionScope> {
    self.conditions.last()
  }

  pub(crate) fn condition_mut(&mut self) -> Option<&mut ConditionScope> {
    self.conditions.last_mut()
  }

  /// Detached best-effort work (log writes). Joined before the execution
  /// returns so observers see a consistent picture.
  pub(crate) fn spawn_background(&mut self, handle: JoinHandle<()>) {
    self.background.push(handle);
  }

  pub(crate) async fn join_background(&mut self) {
    for handle in self.background.drain(..) {
      let _ = handle.await;
    }
  }

  pub fn operations(&self) -> usize {
    self.operations
  }

  pub fn stack_depth(&self) -> usize {
    self.stack_depth
  }

  pub fn actions(&self) -> usize {
    self.actions
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use skein_provider::{CapturingLog, CapturingMessaging};

  fn test_context(limits: Limits) -> ExecutionContext {
    ExecutionContext::new(
      CancellationToken::new(),
      Arc::new(EventData::default()),
      FlowProviders::new(
        Arc::new(CapturingMessaging::new()),
        Arc::new(CapturingLog::new()),
      ),
      limits,
    )
  }

  #[test]
  fn operations_accumulate_but_depth_releases() {
    let mut ctx = test_context(Limits {
      max_stack_depth: 2,
      max_operations: 3,
      max_actions: 1,
    });

    ctx.start_operation().unwrap();
    ctx.start_operation().unwrap();
    ctx.end_operation();
    ctx.end_operation();
    assert_eq!(ctx.stack_depth(), 0);
    assert_eq!(ctx.operations(), 2);

    ctx.start_operation().unwrap();
    assert!(matches!(
      ctx.start_operation(),
      Err(FlowError::MaxOperationsReached { limit: 3 })
    ));
  }

  #[test]
  fn stack_depth_ceiling() {
    let mut ctx = test_context(Limits {
      max_stack_depth: 1,
      max_operations: 100,
      max_actions: 1,
    });

    ctx.start_operation().unwrap();
    assert!(matches!(
      ctx.start_operation(),
      Err(FlowError::MaxStackDepthReached { limit: 1 })
    ));
  }

  #[test]
  fn cancellation_checked_before_any_charge() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut ctx = ExecutionContext::new(
      cancel,
      Arc::new(EventData::default()),
      FlowProviders::new(
        Arc::new(CapturingMessaging::new()),
        Arc::new(CapturingLog::new()),
      ),
      Limits::default(),
    );

    assert!(matches!(ctx.start_operation(), Err(FlowError::Cancelled)));
    assert_eq!(ctx.operations(), 0);
  }

  #[test]
  fn condition_scopes_nest() {
    let mut ctx = test_context(Limits::default());
    ctx.push_condition(FlowValue::String("outer".into()), false);
    ctx.condition_mut().unwrap().item_met = true;

    ctx.push_condition(FlowValue::String("inner".into()), true);
    assert!(!ctx.condition().unwrap().item_met);
    assert!(ctx.condition().unwrap().allow_multiple);

    ctx.pop_condition();
    let outer = ctx.condition().unwrap();
    assert!(outer.item_met);
    assert_eq!(outer.base_value, FlowValue::String("outer".into()));
  }
}
