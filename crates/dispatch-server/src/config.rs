use dispatch_loop::DispatchConfig;
use dispatch_mcp::McpConfig;

/// Everything the server needs to come up, assembled from the CLI.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub mcp: McpConfig,
    pub dispatch: DispatchConfig,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: String,
    pub llm_timeout_ms: u64,
}
