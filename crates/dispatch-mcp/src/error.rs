use thiserror::Error;

use dispatch_core::DispatchError;

#[derive(Error, Debug, Clone)]
pub enum McpError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Server disconnected")]
    Disconnected,
}

impl McpError {
    /// True when the error indicates the underlying transport died, which
    /// entitles `call_tool` to one transparent reconnect-and-retry.
    ///
    /// Besides the typed transport variants, remote errors are sniffed for
    /// the usual connection-loss wording.
    pub fn is_transport_fault(&self) -> bool {
        match self {
            McpError::Transport(_) | McpError::Connection(_) | McpError::Disconnected => true,
            McpError::Protocol(message) | McpError::ToolExecution(message) => {
                let lower = message.to_lowercase();
                lower.contains("connection") || lower.contains("disconnect")
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        McpError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for McpError {
    fn from(e: std::io::Error) -> Self {
        McpError::Transport(e.to_string())
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        McpError::Transport(e.to_string())
    }
}

impl From<McpError> for DispatchError {
    fn from(e: McpError) -> Self {
        match &e {
            McpError::Connection(_) | McpError::Disconnected | McpError::InvalidConfig(_) => {
                DispatchError::McpConnection(e.to_string())
            }
            _ => DispatchError::McpToolExecution(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
