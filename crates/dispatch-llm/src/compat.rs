//! OpenAI-compatible request serialization and stream-chunk parsing.

use serde::Deserialize;
use serde_json::{json, Value};

use dispatch_core::{Message, Role, ToolSchema};

use crate::provider::Result;
use crate::types::{LlmChunk, StreamToolCall};

/// Convert conversation messages to the OpenAI wire shape.
pub fn messages_to_wire_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(tool_calls) = &m.tool_calls {
                msg["tool_calls"] = json!(tool_calls);
            }

            msg
        })
        .collect()
}

/// Build a streaming chat-completion request body.
pub fn build_request_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSchema],
    max_output_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_wire_json(messages),
        "stream": true,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools);
        body["tool_choice"] = json!("auto");
    }

    if let Some(max_tokens) = max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

// --- Streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct CompatStreamChunk {
    choices: Vec<CompatChoice>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    delta: CompatDelta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CompatDelta {
    content: Option<String>,
    #[allow(dead_code)]
    role: Option<String>,
    tool_calls: Option<Vec<StreamToolCall>>,
}

fn chunk_from_parsed(chunk: CompatStreamChunk) -> LlmChunk {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return LlmChunk::Token(String::new());
    };

    if let Some(tool_calls) = choice.delta.tool_calls {
        if !tool_calls.is_empty() {
            return LlmChunk::ToolCalls(tool_calls);
        }
    }

    LlmChunk::Token(choice.delta.content.unwrap_or_default())
}

/// Parse an SSE `data:` payload.
///
/// `"[DONE]"` maps to [`LlmChunk::Done`]; malformed JSON is an error.
pub fn parse_sse_data(data: &str) -> Result<LlmChunk> {
    if data.trim() == "[DONE]" {
        return Ok(LlmChunk::Done);
    }

    let chunk: CompatStreamChunk = serde_json::from_str(data)?;
    Ok(chunk_from_parsed(chunk))
}
