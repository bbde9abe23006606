//! Data model for skein flows.
//!
//! A flow is a user-authored automation definition stored as a flat
//! node/edge graph. This crate holds the serde types for that graph, the
//! `FlowValue` runtime value used by the interpreter, and the
//! Discord-shaped wire types consumed by capability providers. It contains
//! no execution logic.

mod edge;
mod graph;
mod message;
mod node;
mod value;

pub use edge::FlowEdge;
pub use graph::FlowGraph;
pub use message::{Embed, Interaction, InteractionResponse, Message, MessageData};
pub use node::{CompareMode, FlowNode, LogLevel, NodeData, NodeKind, NodePosition};
pub use value::FlowValue;
