//! Scripted fakes behind the provider/dispatcher seams for handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};

use dispatch_core::{DispatchError, Message, ToolDispatcher, ToolSchema};
use dispatch_llm::{LlmChunk, LlmError, LlmProvider, LlmStream};
use dispatch_loop::DispatchConfig;
use dispatch_mcp::{McpConfig, McpSession};

use crate::state::AppState;

/// Provider that replays scripted turns; an exhausted script is an API error.
pub struct ScriptedLlm {
    turns: Mutex<Vec<Vec<Result<LlmChunk, LlmError>>>>,
}

impl ScriptedLlm {
    pub fn new(turns: Vec<Vec<Result<LlmChunk, LlmError>>>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat_stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
        _max_output_tokens: Option<u32>,
    ) -> dispatch_llm::Result<LlmStream> {
        let mut turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            return Err(LlmError::Api("no scripted turns left".to_string()));
        }
        let turn = turns.remove(0);
        Ok(Box::pin(stream::iter(turn)))
    }
}

pub struct StubTools {
    fail: bool,
}

impl StubTools {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self { fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true })
    }
}

#[async_trait]
impl ToolDispatcher for StubTools {
    async fn dispatch(&self, _name: &str, _args: Value) -> dispatch_core::Result<String> {
        if self.fail {
            Err(DispatchError::McpToolExecution("tool blew up".to_string()))
        } else {
            Ok("5".to_string())
        }
    }

    fn available_tools(&self) -> Vec<ToolSchema> {
        vec![ToolSchema::function(
            "add",
            "Add numbers",
            json!({ "type": "object", "properties": {} }),
        )]
    }
}

pub fn token(text: &str) -> Result<LlmChunk, LlmError> {
    Ok(LlmChunk::Token(text.to_string()))
}

pub fn done() -> Result<LlmChunk, LlmError> {
    Ok(LlmChunk::Done)
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> Result<LlmChunk, LlmError> {
    Ok(LlmChunk::ToolCalls(vec![dispatch_llm::StreamToolCall {
        index: 0,
        id: Some(id.to_string()),
        tool_type: Some("function".to_string()),
        function: Some(dispatch_llm::StreamFunctionCall {
            name: Some(name.to_string()),
            arguments: Some(arguments.to_string()),
        }),
    }]))
}

/// State wired to fakes. The session is real but never connected; handlers
/// that only touch `tools`/`llm` never reach it, and the health snapshot
/// reports it as disconnected.
pub fn test_state(llm: Arc<dyn LlmProvider>, tools: Arc<dyn ToolDispatcher>) -> AppState {
    AppState {
        session: Arc::new(McpSession::new(McpConfig::new("http://localhost:1/sse"))),
        tools,
        llm,
        dispatch: DispatchConfig::default(),
    }
}
