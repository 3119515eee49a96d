//! # Parlance Core
//!
//! Domain types, traits, and error definitions for the Parlance conversational
//! session gateway. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! The shape of the system: one shared agent instance holds the conversation
//! log; the gateway streams its turns over SSE, dispatches ad-hoc tool calls,
//! and persists/restores history. Everything those components agree on lives
//! here.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role, ToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use tool::{
    FunctionDefinition, Tool, ToolDescriptor, ToolExecutionResult, ToolRegistry,
};
