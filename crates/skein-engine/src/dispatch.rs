//! Matches incoming events to compiled flows and runs them.
//!
//! The dispatcher owns the registry of compiled command and listener
//! trees. Each incoming event is matched to zero or more flows; every
//! match runs as an independent task with its own `ExecutionContext` and
//! a deadline-bound cancellation token. Compiled trees are shared
//! read-only between concurrent executions.

use std::sync::Arc;
use std::time::Duration;

use skein_provider::FlowProviders;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::compile::CompiledFlow;
use crate::context::{ContextData, ExecutionContext, Limits};

const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FlowDispatcher {
  commands: Vec<Arc<CompiledFlow>>,
  listeners: Vec<Arc<CompiledFlow>>,
  providers: FlowProviders,
  limits: Limits,
  timeout: Duration,
}

impl FlowDispatcher {
  pub fn new(providers: FlowProviders, limits: Limits) -> Self {
    Self {
      commands: Vec::new(),
      listeners: Vec::new(),
      providers,
      limits,
      timeout: DEFAULT_EXECUTION_TIMEOUT,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Register a compiled command flow. Replaces any previously registered
  /// command with the same name; in-flight executions keep their old tree.
  pub fn register_command(&mut self, flow: Arc<CompiledFlow>) {
    let name = flow.command_name().map(str::to_owned);
    self
      .commands
      .retain(|existing| existing.command_name().map(str::to_owned) != name);
    self.commands.push(flow);
  }

  /// Register a compiled event-listener flow.
  pub fn register_listener(&mut self, flow: Arc<CompiledFlow>) {
    self.listeners.push(flow);
  }

  /// All flows matching the given event: commands by invoked command
  /// name, listeners by gateway event type.
  pub fn matches(&self, data: &dyn ContextData) -> Vec<Arc<CompiledFlow>> {
    let mut matched = Vec::new();

    if let Some(command) = data.command_name() {
      matched.extend(
        self
          .commands
          .iter()
          .filter(|flow| flow.command_name() == Some(command))
          .cloned(),
      );
    }

    if let Some(event_type) = data.event_type() {
      matched.extend(
        self
          .listeners
          .iter()
          .filter(|flow| flow.event_type() == Some(event_type))
          .cloned(),
      );
    }

    matched
  }

  /// Dispatch one event: run every matching flow concurrently and wait
  /// for all of them. Returns the number of matched flows.
  pub async fn handle_event(&self, data: Arc<dyn ContextData>) -> usize {
    let matched = self.matches(data.as_ref());
    let count = matched.len();

    let mut handles = Vec::with_capacity(count);
    for flow in matched {
      let data = data.clone();
      let providers = self.providers.clone();
      let limits = self.limits;
      let timeout = self.timeout;

      handles.push(tokio::spawn(async move {
        run_flow(flow, data, providers, limits, timeout).await;
      }));
    }

    for handle in handles {
      let _ = handle.await;
    }

    count
  }
}

/// Run one flow against one event with a deadline-bound token.
///
/// Cancellation is observed at node-dispatch granularity: a provider call
/// already in flight when the deadline passes runs to its own conclusion.
async fn run_flow(
  flow: Arc<CompiledFlow>,
  data: Arc<dyn ContextData>,
  providers: FlowProviders,
  limits: Limits,
  timeout: Duration,
) {
  let execution_id = uuid::Uuid::new_v4().to_string();
  let cancel = CancellationToken::new();

  let timer = {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(timeout).await;
      cancel.cancel();
    })
  };

  let mut ctx = ExecutionContext::new(cancel, data, providers, limits);
  let result = flow.execute(&mut ctx).await;
  timer.abort();

  match result {
    Ok(()) => {
      info!(
        execution_id = %execution_id,
        entry_node = %flow.entry().id,
        operations = ctx.operations(),
        "flow execution completed"
      );
    }
    Err(err) => {
      error!(
        execution_id = %execution_id,
        entry_node = %flow.entry().id,
        error = %err,
        "flow execution failed"
      );
    }
  }
}

/// Channel-fed run loop around a dispatcher.
///
/// The gateway (or any other event source) pushes events through the
/// sender; the loop dispatches each one until cancelled or the channel
/// closes.
pub struct FlowRunner {
  sender: mpsc::Sender<Arc<dyn ContextData>>,
  receiver: mpsc::Receiver<Arc<dyn ContextData>>,
  dispatcher: Arc<FlowDispatcher>,
}

impl FlowRunner {
  pub fn new(dispatcher: Arc<FlowDispatcher>) -> Self {
    Self::with_buffer_size(dispatcher, 100)
  }

  pub fn with_buffer_size(dispatcher: Arc<FlowDispatcher>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      dispatcher,
    }
  }

  /// Sender handle for event sources.
  pub fn sender(&self) -> mpsc::Sender<Arc<dyn ContextData>> {
    self.sender.clone()
  }

  pub fn dispatcher(&self) -> &FlowDispatcher {
    &self.dispatcher
  }

  /// Run until the cancellation token fires or the channel closes.
  pub async fn start(self, cancel: CancellationToken) {
    let FlowRunner {
      sender,
      mut receiver,
      dispatcher,
    } = self;
    // The runner's own sender handle is released so the channel closes
    // once every external sender is gone.
    drop(sender);

    info!("starting flow runner");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("flow runner cancelled");
          break;
        }
        event = receiver.recv() => {
          match event {
            Some(data) => {
              let matched = dispatcher.handle_event(data).await;
              info!(matched, "event dispatched");
            }
            None => {
              info!("flow runner channel closed");
              break;
            }
          }
        }
      }
    }
  }
}
