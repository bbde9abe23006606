//! Resolves `{{ ... }}` expressions embedded in authored strings.
//!
//! Expressions are rendered with minijinja against a flat binding context
//! of `Variables.<name>` plus the contextual accessors exposed by the
//! event data view (user, member, guild, channel, command, attachment).
//! The contract with the evaluator is narrow: string in, resolved string
//! or error out.

use minijinja::Environment;
use skein_flow::FlowValue;

use crate::context::ExecutionContext;
use crate::error::FlowError;

pub fn contains_template(input: &str) -> bool {
  input.contains("{{")
}

/// Render a single authored string against the execution's bindings.
/// Strings without template markers pass through without touching the
/// evaluator.
pub fn resolve_str(input: &str, ctx: &ExecutionContext) -> Result<String, FlowError> {
  if !contains_template(input) {
    return Ok(input.to_string());
  }

  let env = Environment::new();
  let bindings = binding_context(ctx);
  env
    .render_str(input, minijinja::Value::from_serialize(&bindings))
    .map_err(|e| FlowError::Template {
      message: e.to_string(),
    })
}

/// Clone-and-resolve an authored value. The compiled tree is shared
/// across executions, so node data is never rewritten in place.
pub fn resolve_value(value: &FlowValue, ctx: &ExecutionContext) -> Result<FlowValue, FlowError> {
  let mut resolved = value.clone();
  resolved.resolve_variables(|s| resolve_str(s, ctx))?;
  Ok(resolved)
}

fn binding_context(ctx: &ExecutionContext) -> serde_json::Value {
  let mut root = match ctx.data.template_env() {
    serde_json::Value::Object(map) => map,
    _ => serde_json::Map::new(),
  };

  let variables: serde_json::Map<String, serde_json::Value> = ctx
    .variables
    .iter()
    .map(|(name, value)| (name.clone(), value.as_json()))
    .collect();
  root.insert(
    "Variables".to_string(),
    serde_json::Value::Object(variables),
  );

  serde_json::Value::Object(root)
}
