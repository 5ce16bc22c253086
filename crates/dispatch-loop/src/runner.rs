use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use dispatch_core::{
    Conversation, DispatchError, DoneReason, EventSink, Message, StreamEvent, ToolDispatcher,
};
use dispatch_llm::LlmProvider;

use crate::config::DispatchConfig;
use crate::stream::consume_llm_stream;

#[derive(Debug)]
pub struct DispatchOutcome {
    pub reason: DoneReason,
    /// The assistant's accumulated text, possibly empty on failure.
    pub answer: String,
}

enum Terminal {
    Answered,
    MaxTurns,
}

fn reason_for(error: &DispatchError) -> DoneReason {
    match error {
        DispatchError::McpConnection(_) => DoneReason::McpUnavailable,
        DispatchError::McpToolExecution(_) => DoneReason::ToolFailedFatal,
        DispatchError::LlmQuery(_) => DoneReason::LlmFailed,
        DispatchError::SchemaConversion(_) => DoneReason::LlmFailed,
        DispatchError::Cancelled => DoneReason::Cancelled,
        DispatchError::WriterGone => DoneReason::Cancelled,
    }
}

/// Run one question to completion.
///
/// Streams events into `sink` and always finishes the stream with a single
/// `done` event, except when the sink itself is gone. The returned outcome
/// mirrors the terminal event.
pub async fn run_dispatch(
    question: &str,
    sink: EventSink,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolDispatcher>,
    cancel: CancellationToken,
    config: DispatchConfig,
) -> DispatchOutcome {
    let mut conversation = Conversation::seeded(&config.system_guide, question);
    let mut answer = String::new();

    let result = dispatch_turns(
        &mut conversation,
        &mut answer,
        &sink,
        llm,
        tools,
        &cancel,
        &config,
    )
    .await;

    match result {
        Ok(Terminal::Answered) => {
            let reason = DoneReason::Answered;
            let _ = sink.send(StreamEvent::Done { reason }).await;
            DispatchOutcome { reason, answer }
        }
        Ok(Terminal::MaxTurns) => {
            let error = DispatchError::LlmQuery(format!(
                "no final answer within {} turns",
                config.max_turns
            ));
            let _ = sink.send(StreamEvent::error(&error)).await;
            let reason = DoneReason::MaxTurns;
            let _ = sink.send(StreamEvent::Done { reason }).await;
            DispatchOutcome { reason, answer }
        }
        Err(DispatchError::WriterGone) => {
            // The caller is gone; nothing left to tell anyone.
            log::debug!("Stream consumer disconnected; abandoning dispatch");
            DispatchOutcome {
                reason: DoneReason::Cancelled,
                answer,
            }
        }
        Err(error) => {
            let reason = reason_for(&error);
            let _ = sink.send(StreamEvent::error(&error)).await;
            let _ = sink.send(StreamEvent::Done { reason }).await;
            DispatchOutcome { reason, answer }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_turns(
    conversation: &mut Conversation,
    answer: &mut String,
    sink: &EventSink,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolDispatcher>,
    cancel: &CancellationToken,
    config: &DispatchConfig,
) -> Result<Terminal, DispatchError> {
    for turn in 0..config.max_turns {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let tool_schemas = tools.available_tools();
        log::debug!(
            "Dispatch turn {}/{}: {} messages, {} tools",
            turn + 1,
            config.max_turns,
            conversation.len(),
            tool_schemas.len()
        );

        let stream = llm
            .chat_stream(
                &conversation.messages,
                &tool_schemas,
                config.max_output_tokens,
            )
            .await?;

        let output = consume_llm_stream(stream, sink, cancel).await?;
        answer.push_str(&output.content);

        if output.tool_calls.is_empty() {
            return Ok(Terminal::Answered);
        }

        conversation.push(Message::assistant(
            output.content.clone(),
            Some(output.tool_calls.clone()),
        ));

        for call in &output.tool_calls {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let arguments = parse_call_arguments(&call.function.name, &call.function.arguments)?;

            sink.send(StreamEvent::ToolCallBegin {
                call_id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: arguments.clone(),
            })
            .await?;

            let dispatched = tokio::select! {
                _ = cancel.cancelled() => {
                    // Keep the begin/end pairing intact even when the call
                    // is abandoned.
                    let _ = sink
                        .send(StreamEvent::tool_call_failed(&call.id, "cancelled"))
                        .await;
                    return Err(DispatchError::Cancelled);
                }
                result = tools.dispatch(&call.function.name, arguments) => result,
            };

            match dispatched {
                Ok(result) => {
                    sink.send(StreamEvent::tool_call_succeeded(&call.id, &result))
                        .await?;
                    conversation.push(Message::tool_result(&call.id, result));
                }
                Err(error) => {
                    sink.send(StreamEvent::tool_call_failed(&call.id, error.to_string()))
                        .await?;
                    return Err(error);
                }
            }
        }
    }

    Ok(Terminal::MaxTurns)
}

/// Reassembled tool-call arguments must parse as JSON; an unparseable blob
/// means the model emitted a broken call and the dispatch cannot proceed.
fn parse_call_arguments(name: &str, raw: &str) -> Result<Value, DispatchError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(raw).map_err(|e| {
        DispatchError::LlmQuery(format!("invalid tool-call arguments for '{name}': {e}"))
    })
}
