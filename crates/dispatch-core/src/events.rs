use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::DispatchError;

/// Why a dispatch ended. Carried by the terminal `done` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    Answered,
    MaxTurns,
    Cancelled,
    ToolFailedFatal,
    McpUnavailable,
    LlmFailed,
}

/// One caller-visible event.
///
/// Events are emitted in the order the dispatch loop produces them; `done` is
/// always the last event of a stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Delta {
        text: String,
    },
    ToolCallBegin {
        call_id: String,
        name: String,
        arguments: Value,
    },
    ToolCallEnd {
        call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        kind: String,
        message: String,
    },
    Done {
        reason: DoneReason,
    },
}

impl StreamEvent {
    pub fn tool_call_succeeded(call_id: impl Into<String>, result: impl Into<String>) -> Self {
        StreamEvent::ToolCallEnd {
            call_id: call_id.into(),
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn tool_call_failed(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        StreamEvent::ToolCallEnd {
            call_id: call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn error(err: &DispatchError) -> Self {
        StreamEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    /// Event kind name, used as the record header by the stream encoder.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Delta { .. } => "delta",
            StreamEvent::ToolCallBegin { .. } => "tool_call_begin",
            StreamEvent::ToolCallEnd { .. } => "tool_call_end",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done { .. } => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }
}

/// Sending half of the per-request event stream.
///
/// A closed receiver means the caller went away; that surfaces as
/// [`DispatchError::WriterGone`] so the loop can abandon in-flight work.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: StreamEvent) -> Result<(), DispatchError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DispatchError::WriterGone)
    }
}
