use clap::Parser;
use std::io;

mod config;
mod encoder;
mod handlers;
mod server;
mod state;

#[cfg(test)]
mod testutil;

use config::ServerConfig;
use dispatch_loop::DispatchConfig;
use dispatch_mcp::McpConfig;
use server::run_server;

#[derive(Parser, Debug, Clone)]
#[command(name = "dispatch-server")]
#[command(about = "Tool-mediated LLM dispatch service")]
#[command(version)]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value = "8081")]
    port: u16,

    /// MCP tool server URL (SSE endpoint)
    #[arg(long, env = "MCP_SERVER_URL", default_value = "http://localhost:9000/sse")]
    mcp_server_url: String,

    /// Per-attempt MCP connect timeout (seconds)
    #[arg(long, env = "MCP_CONNECTION_TIMEOUT", default_value = "10")]
    mcp_connection_timeout: u64,

    /// Max MCP initialize attempts
    #[arg(long, env = "MCP_RETRY_ATTEMPTS", default_value = "3")]
    mcp_retry_attempts: u32,

    /// MCP reconnect backoff base (seconds)
    #[arg(long, env = "MCP_RETRY_DELAY", default_value = "2")]
    mcp_retry_delay: u64,

    /// Per-call MCP tool timeout (seconds)
    #[arg(long, env = "MCP_CALL_TIMEOUT", default_value = "30")]
    mcp_call_timeout: u64,

    /// Dispatch loop iteration cap
    #[arg(long, env = "MAX_TURNS", default_value = "8")]
    max_turns: usize,

    /// LLM API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    llm_base_url: String,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", default_value = "sk-test")]
    llm_api_key: String,

    /// Per-turn LLM call timeout (seconds)
    #[arg(long, env = "LLM_TIMEOUT", default_value = "120")]
    llm_timeout: u64,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let mcp = McpConfig {
            server_url: self.mcp_server_url,
            connect_timeout_ms: self.mcp_connection_timeout * 1_000,
            retry_attempts: self.mcp_retry_attempts,
            retry_delay_ms: self.mcp_retry_delay * 1_000,
            call_timeout_ms: self.mcp_call_timeout * 1_000,
        };

        ServerConfig {
            port: self.port,
            mcp,
            dispatch: DispatchConfig::default().with_max_turns(self.max_turns),
            llm_base_url: self.llm_base_url,
            llm_model: self.llm_model,
            llm_api_key: self.llm_api_key,
            llm_timeout_ms: self.llm_timeout * 1_000,
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    log::info!("Starting dispatch server on port {}", cli.port);
    log::info!("  MCP server: {}", cli.mcp_server_url);
    log::info!("  LLM: {} ({})", cli.llm_base_url, cli.llm_model);
    log::info!("  Max turns: {}", cli.max_turns);

    run_server(cli.into_config()).await
}
