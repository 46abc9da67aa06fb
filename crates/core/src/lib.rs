//! # codewright core
//!
//! Domain types, traits, and error definitions for the codewright coding agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`Provider`] is the model client
//! - [`Tool`] / [`ToolRegistry`] is the in-process tool registry
//! - [`RemoteToolBackend`] is a remote tool server (MCP or similar)
//!
//! Implementations live in their respective crates, so the orchestrator can be
//! tested against scripted doubles.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod remote;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, RemoteError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use remote::RemoteToolBackend;
pub use tool::{Tool, ToolCall, ToolDescriptor, ToolOrigin, ToolRegistry, ToolResult};
