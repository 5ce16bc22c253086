//! MCP (Model Context Protocol) client for the dispatch service.
//!
//! Owns the single upstream connection: JSON-RPC protocol client over a
//! pluggable transport, schema translation into the LLM function-calling
//! shape, the tool catalog with usage counters, and the session state machine
//! with reconnect/backoff.

pub mod catalog;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod translate;
pub mod transport;

pub use catalog::ToolCatalog;
pub use config::McpConfig;
pub use error::{McpError, Result};
pub use session::{McpSession, SessionState, SessionStats};
pub use translate::{translate, translate_catalog, validate};
pub use transport::{HttpSseTransport, McpTransport};
