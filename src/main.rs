use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use skein_engine::{CompiledFlow, EventData, ExecutionContext, Limits, compile_command, compile_event};
use skein_flow::{FlowGraph, Interaction};
use skein_provider::{CapturingMessaging, FlowProviders, TracingLogProvider};

/// Skein - compiles and executes flows authored in the visual editor
#[derive(Parser)]
#[command(name = "skein")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a flow file and print what it declares
  Check {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Compile as an event-listener flow instead of a command flow
    #[arg(long)]
    event: bool,
  },

  /// Execute a flow once against an event payload read from stdin
  Run {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Compile as an event-listener flow instead of a command flow
    #[arg(long)]
    event: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Check { flow_file, event }) => {
      check_flow(flow_file, event)?;
    }
    Some(Commands::Run { flow_file, event }) => {
      run_flow(flow_file, event)?;
    }
    None => {
      println!("skein - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_flow(flow_file: &PathBuf, event: bool) -> Result<CompiledFlow> {
  let content = std::fs::read_to_string(flow_file)
    .with_context(|| format!("failed to read flow file: {}", flow_file.display()))?;

  let graph: FlowGraph = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse flow file: {}", flow_file.display()))?;

  let flow = if event {
    compile_event(&graph).context("failed to compile event flow")?
  } else {
    compile_command(&graph).context("failed to compile command flow")?
  };

  Ok(flow)
}

fn check_flow(flow_file: PathBuf, event: bool) -> Result<()> {
  let flow = load_flow(&flow_file, event)?;

  eprintln!("Compiled flow with {} nodes", flow.len());
  if let Some(name) = flow.command_name() {
    eprintln!("Command: /{name}");
    for option in flow.command_options() {
      eprintln!("  option: {} ({})", option.name, option.description);
    }
  }
  if let Some(event_type) = flow.event_type() {
    eprintln!("Listens for: {event_type}");
  }

  Ok(())
}

fn run_flow(flow_file: PathBuf, event: bool) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_flow_async(flow_file, event).await })
}

async fn run_flow_async(flow_file: PathBuf, event: bool) -> Result<()> {
  let flow = load_flow(&flow_file, event)?;

  let payload = read_payload_from_stdin()?;
  let data = event_from_payload(payload, &flow)?;

  // Messages are captured rather than sent; log entries go to stderr
  // through the process tracing subscriber.
  let messaging = Arc::new(CapturingMessaging::new());
  let providers = FlowProviders::new(messaging.clone(), Arc::new(TracingLogProvider));

  let mut ctx = ExecutionContext::new(
    CancellationToken::new(),
    Arc::new(data),
    providers,
    Limits::default(),
  );

  flow
    .execute(&mut ctx)
    .await
    .context("flow execution failed")?;

  eprintln!(
    "Execution completed: {} operations, {} actions",
    ctx.operations(),
    ctx.actions()
  );

  let responses: Vec<serde_json::Value> = messaging
    .responses
    .lock()
    .unwrap()
    .iter()
    .map(|r| {
      serde_json::json!({
        "interaction_id": r.interaction_id,
        "response": r.response,
      })
    })
    .collect();
  let messages = messaging.messages.lock().unwrap().clone();

  let output = serde_json::json!({
    "responses": responses,
    "messages": messages,
  });
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

/// Build the event view the flow executes against from the stdin payload.
///
/// Recognized fields: `interaction` ({id, token}), `guild_id`,
/// `channel_id`, `command_name`, `event_type`, and `env` (template
/// bindings). A command flow without an explicit `command_name` defaults
/// to its own declared name so it matches itself.
fn event_from_payload(payload: serde_json::Value, flow: &CompiledFlow) -> Result<EventData> {
  let get_str = |key: &str| {
    payload
      .get(key)
      .and_then(|v| v.as_str())
      .map(str::to_owned)
  };

  let interaction: Option<Interaction> = match payload.get("interaction") {
    Some(raw) => Some(
      serde_json::from_value(raw.clone()).context("failed to parse interaction from payload")?,
    ),
    None => None,
  };

  Ok(EventData {
    interaction,
    guild_id: get_str("guild_id"),
    channel_id: get_str("channel_id"),
    command_name: get_str("command_name")
      .or_else(|| flow.command_name().map(str::to_owned)),
    event_type: get_str("event_type").or_else(|| flow.event_type().map(str::to_owned)),
    env: payload.get("env").cloned().unwrap_or(serde_json::json!({})),
  })
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
