use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use dispatch_core::{DispatchError, Message, ToolSchema};

use crate::types::LlmChunk;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<LlmError> for DispatchError {
    fn from(e: LlmError) -> Self {
        DispatchError::LlmQuery(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmChunk>> + Send>>;

/// Streaming chat-completion seam.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Open a streaming completion for `messages` with `tools` advertised
    /// for function calling.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        max_output_tokens: Option<u32>,
    ) -> Result<LlmStream>;
}
