use std::sync::Arc;

use dispatch_core::ToolDispatcher;
use dispatch_llm::{LlmProvider, OpenAiProvider};
use dispatch_loop::DispatchConfig;
use dispatch_mcp::McpSession;

use crate::config::ServerConfig;

/// Shared server state. The MCP session is a single process-wide resource;
/// everything else is cheap to clone per request. `tools` is the session
/// behind its dispatcher seam, so handlers stay testable against fakes.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<McpSession>,
    pub tools: Arc<dyn ToolDispatcher>,
    pub llm: Arc<dyn LlmProvider>,
    pub dispatch: DispatchConfig,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        log::info!(
            "LLM endpoint: {} (model {})",
            config.llm_base_url,
            config.llm_model
        );

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(config.llm_api_key.clone())
                .with_base_url(config.llm_base_url.clone())
                .with_model(config.llm_model.clone())
                .with_timeout_ms(config.llm_timeout_ms),
        );

        let session = Arc::new(McpSession::new(config.mcp.clone()));
        Self {
            tools: session.clone(),
            session,
            llm,
            dispatch: config.dispatch.clone(),
        }
    }

    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
