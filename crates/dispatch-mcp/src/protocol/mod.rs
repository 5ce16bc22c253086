pub mod client;
pub mod models;

pub use client::McpProtocolClient;
pub use models::*;
