//! Compiles authored flow graphs and executes them against live events.
//!
//! The engine has three stages. [`compile`] links the flat node/edge
//! graph the editor stores into an immutable tree and rejects defective
//! graphs up front. [`FlowDispatcher`](dispatch::FlowDispatcher) matches
//! incoming events to compiled trees. [`CompiledFlow::execute`] then
//! interprets one tree against one event, with side effects going through
//! the provider bundle and resource quotas enforced per invocation.

pub mod compile;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod template;

pub use compile::{compile, compile_command, compile_event, CommandOption, CompiledFlow, CompiledNode};
pub use context::{ContextData, EventData, ExecutionContext, Limits};
pub use dispatch::{FlowDispatcher, FlowRunner};
pub use error::{CompileError, FlowError};
