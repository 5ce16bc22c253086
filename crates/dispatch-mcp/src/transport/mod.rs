pub mod http_sse;

pub use http_sse::HttpSseTransport;

use async_trait::async_trait;

use crate::error::Result;

/// Transport seam for MCP communication.
///
/// Messages are whole JSON-RPC documents as text; framing is the transport's
/// concern.
#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn connect(&mut self) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    async fn send(&self, message: String) -> Result<()>;
    /// Receive the next inbound message, or `None` when nothing is pending.
    async fn receive(&self) -> Result<Option<String>>;
    fn is_connected(&self) -> bool;
}
