//! LLM provider layer: streaming chat completions with function calling
//! against OpenAI-compatible endpoints.

pub mod accumulator;
pub mod compat;
pub mod openai;
pub mod provider;
pub mod sse;
pub mod types;

pub use accumulator::StreamToolAccumulator;
pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, LlmStream, Result};
pub use types::{LlmChunk, StreamFunctionCall, StreamToolCall};
