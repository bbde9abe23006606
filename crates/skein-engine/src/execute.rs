//! The flow interpreter.
//!
//! Execution is a one-shot depth-first traversal of the compiled tree:
//! there is no long-lived state machine, the call stack is the state. Each
//! node dispatch is bracketed by the context's operation accounting, and
//! the first error anywhere stops the remaining siblings (fail-fast).

use std::time::Duration;

use futures::future::BoxFuture;
use skein_flow::{CompareMode, FlowValue, InteractionResponse, NodeKind};

use crate::compile::{CompiledFlow, CompiledNode};
use crate::context::ExecutionContext;
use crate::error::FlowError;
use crate::template;

/// Ceiling for a single detached log write.
const LOG_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

impl CompiledFlow {
  /// Interpret this flow against a live triggering event.
  ///
  /// Terminates either by exhausting the tree or with the first
  /// propagated error. Side effects already committed through providers
  /// stand either way; there is no rollback.
  pub async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), FlowError> {
    let result = self.execute_node(self.entry(), ctx).await;
    // Detached log writes are joined here so observers see a settled
    // picture once execute returns.
    ctx.join_background().await;
    result
  }

  fn execute_node<'a, 'b>(
    &'a self,
    node: &'a CompiledNode,
    ctx: &'b mut ExecutionContext,
  ) -> BoxFuture<'b, Result<(), FlowError>>
  where
    'a: 'b,
  {
    Box::pin(async move {
      if let Err(err) = ctx.start_operation() {
        return Err(FlowError::trace(&node.id, err));
      }

      let result = self.dispatch(node, ctx).await;

      // Depth must be released on every exit path so siblings are not
      // starved by an artificially inflated stack.
      ctx.end_operation();

      result.map_err(|err| FlowError::trace(&node.id, err))
    })
  }

  async fn dispatch(
    &self,
    node: &CompiledNode,
    ctx: &mut ExecutionContext,
  ) -> Result<(), FlowError> {
    if node.kind.is_action() {
      ctx.start_action()?;
    }

    match node.kind {
      NodeKind::EntryCommand | NodeKind::EntryEvent => self.execute_children(node, ctx).await,

      NodeKind::ActionResponseCreate => {
        let interaction = ctx
          .data
          .interaction()
          .cloned()
          .ok_or(FlowError::MissingInteraction)?;

        let content = template::resolve_str(&node.data.message_data.content, ctx)?;
        let response = InteractionResponse {
          content,
          ephemeral: node.data.message_ephemeral,
          embeds: node.data.message_data.embeds.clone(),
        };

        let messaging = ctx.providers.messaging.clone();
        messaging
          .create_interaction_response(&interaction.id, &interaction.token, response)
          .await?;

        self.execute_children(node, ctx).await
      }

      NodeKind::ActionMessageCreate => {
        let channel_id = ctx.data.channel_id().unwrap_or_default().to_string();

        let mut data = node.data.message_data.clone();
        data.content = template::resolve_str(&data.content, ctx)?;

        let messaging = ctx.providers.messaging.clone();
        let message = messaging.create_message(&channel_id, data).await?;

        if !node.data.result_variable_name.is_empty() {
          ctx
            .variables
            .insert(node.data.result_variable_name.clone(), FlowValue::Message(message));
        }

        self.execute_children(node, ctx).await
      }

      NodeKind::ActionLog => {
        let message = template::resolve_str(&node.data.log_message, ctx)?;
        let level = node.data.log_level;
        let log = ctx.providers.log.clone();

        // Best-effort telemetry: detached from this execution's
        // cancellation, bounded by its own timeout, never fails the flow.
        ctx.spawn_background(tokio::spawn(async move {
          let _ = tokio::time::timeout(LOG_WRITE_TIMEOUT, log.create_log_entry(level, message))
            .await;
        }));

        self.execute_children(node, ctx).await
      }

      NodeKind::ConditionCompare => {
        let base = template::resolve_value(&node.data.condition_base_value, ctx)?;
        ctx.push_condition(base, node.data.condition_allow_multiple);
        let result = self.run_condition_children(node, ctx).await;
        ctx.pop_condition();
        result
      }

      NodeKind::ConditionItemCompare => {
        let Some(scope) = ctx.condition() else {
          // Orphan condition item outside any condition_compare.
          return Ok(());
        };
        if scope.item_met && !scope.allow_multiple {
          // First-match semantics unless multiple matches are allowed.
          return Ok(());
        }
        let base = scope.base_value.clone();

        let item = template::resolve_value(&node.data.condition_item_value, ctx)?;
        let met = match node.data.condition_item_mode {
          CompareMode::Equal => base.loose_equals(&item),
          CompareMode::NotEqual => !base.loose_equals(&item),
          CompareMode::GreaterThan => base.greater_than(&item),
          CompareMode::GreaterThanOrEqual => base.greater_than_or_equal(&item),
          CompareMode::LessThan => base.less_than(&item),
          CompareMode::LessThanOrEqual => base.less_than_or_equal(&item),
          CompareMode::Contains => base.contains(&item),
        };

        if met {
          if let Some(scope) = ctx.condition_mut() {
            scope.item_met = true;
          }
          self.execute_children(node, ctx).await
        } else {
          Ok(())
        }
      }

      NodeKind::ConditionItemElse => match ctx.condition().map(|scope| scope.item_met) {
        Some(false) => self.execute_children(node, ctx).await,
        Some(true) | None => Ok(()),
      },

      _ => Err(FlowError::UnknownNodeType { kind: node.kind }),
    }
  }

  /// The single fan-out primitive: children run strictly in compiled
  /// order and the first failure stops the rest.
  async fn execute_children(
    &self,
    node: &CompiledNode,
    ctx: &mut ExecutionContext,
  ) -> Result<(), FlowError> {
    for &child_idx in &node.children {
      self.execute_node(self.node(child_idx), ctx).await?;
    }
    Ok(())
  }

  /// Condition children: every comparison branch in order first, then at
  /// most one else branch, regardless of where it was authored. When
  /// several else branches exist the last one declared wins.
  async fn run_condition_children(
    &self,
    node: &CompiledNode,
    ctx: &mut ExecutionContext,
  ) -> Result<(), FlowError> {
    let mut else_branch = None;

    for &child_idx in &node.children {
      let child = self.node(child_idx);
      if child.kind == NodeKind::ConditionItemElse {
        else_branch = Some(child);
      } else {
        self.execute_node(child, ctx).await?;
      }
    }

    if let Some(else_node) = else_branch {
      self.execute_node(else_node, ctx).await?;
    }

    Ok(())
  }
}
