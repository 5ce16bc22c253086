use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use dispatch_core::{DispatchError, EventSink, StreamEvent, ToolCall};
use dispatch_llm::{LlmChunk, LlmStream, StreamToolAccumulator};

#[derive(Debug)]
pub struct StreamOutput {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Drain one LLM streaming turn.
///
/// Text fragments are forwarded to the sink as `delta` events as they
/// arrive; tool-call fragments are reassembled and returned. Cancellation is
/// honored between chunks, and a gone sink aborts the read immediately.
pub async fn consume_llm_stream(
    mut stream: LlmStream,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<StreamOutput, DispatchError> {
    let mut content = String::new();
    let mut accumulator = StreamToolAccumulator::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            next = stream.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };

        match chunk {
            Ok(LlmChunk::Token(token)) => {
                if token.is_empty() {
                    continue;
                }
                content.push_str(&token);
                sink.send(StreamEvent::Delta { text: token }).await?;
            }
            Ok(LlmChunk::ToolCalls(fragments)) => {
                log::debug!("Received {} tool-call fragments", fragments.len());
                accumulator.process_chunk(&fragments);
            }
            Ok(LlmChunk::Done) => break,
            Err(e) => return Err(DispatchError::LlmQuery(e.to_string())),
        }
    }

    Ok(StreamOutput {
        content,
        tool_calls: accumulator.into_tool_calls(),
    })
}
