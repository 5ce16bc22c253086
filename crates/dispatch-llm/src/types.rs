use serde::Deserialize;

/// One unit of streamed model output.
#[derive(Debug, Clone)]
pub enum LlmChunk {
    /// A text fragment of the assistant's reply.
    Token(String),
    /// Tool-call fragments; arguments may arrive split across many chunks
    /// and must be reassembled with [`StreamToolAccumulator`].
    ///
    /// [`StreamToolAccumulator`]: crate::accumulator::StreamToolAccumulator
    ToolCalls(Vec<StreamToolCall>),
    /// End of the stream.
    Done,
}

/// A tool-call delta as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamToolCall {
    pub index: u32,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<String>,
    pub function: Option<StreamFunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamFunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
