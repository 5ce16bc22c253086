//! SSE response to [`LlmStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LlmError, LlmStream, Result};
use crate::types::LlmChunk;

fn to_stream_error(err: LlmError) -> LlmError {
    match err {
        LlmError::Stream(msg) => LlmError::Stream(msg),
        other => LlmError::Stream(other.to_string()),
    }
}

/// Convert an SSE HTTP [`Response`] into an [`LlmStream`].
///
/// `handler` sees each event's name and data; it may emit a chunk
/// (`Ok(Some(_))`), skip the event (`Ok(None)`), or fail the stream.
pub fn llm_stream_from_sse<H>(response: Response, mut handler: H) -> LlmStream
where
    H: FnMut(&str, &str) -> Result<Option<LlmChunk>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            handler(event.event.as_str(), event.data.as_str()).map_err(to_stream_error)
        })
        .filter_map(|result| async move {
            match result {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            }
        });

    Box::pin(stream)
}
