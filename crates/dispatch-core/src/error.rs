use thiserror::Error;

/// Central error taxonomy for one dispatch.
///
/// The variants are the caller-visible error kinds; transport- and
/// protocol-level details stay inside the crates that produce them and arrive
/// here as rendered messages.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("MCP connection error: {0}")]
    McpConnection(String),

    #[error("MCP tool execution error: {0}")]
    McpToolExecution(String),

    #[error("LLM query error: {0}")]
    LlmQuery(String),

    #[error("Schema conversion error: {0}")]
    SchemaConversion(String),

    #[error("Dispatch cancelled")]
    Cancelled,

    #[error("Stream consumer disconnected")]
    WriterGone,
}

impl DispatchError {
    /// Stable kind name used in stream `error` events and sync error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::McpConnection(_) => "MCPConnectionError",
            DispatchError::McpToolExecution(_) => "MCPToolExecutionError",
            DispatchError::LlmQuery(_) => "LLMQueryError",
            DispatchError::SchemaConversion(_) => "SchemaConversionError",
            DispatchError::Cancelled => "Cancelled",
            DispatchError::WriterGone => "WriterGone",
        }
    }

    /// Errors that end the dispatch with no recovery attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchError::Cancelled | DispatchError::WriterGone)
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
