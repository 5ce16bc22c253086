//! Shared types for the dispatch service.
//!
//! This crate defines the conversation model, the tool-call and tool-schema
//! shapes exchanged with the LLM, the caller-facing stream events, and the
//! central error taxonomy. Everything here is plain data plus the
//! [`ToolDispatcher`] seam the dispatch loop calls tools through.

pub mod error;
pub mod events;
pub mod message;
pub mod tools;

pub use error::{DispatchError, Result};
pub use events::{DoneReason, EventSink, StreamEvent};
pub use message::{Conversation, Message, Role};
pub use tools::{FunctionCall, FunctionSchema, ToolCall, ToolDispatcher, ToolSchema};
