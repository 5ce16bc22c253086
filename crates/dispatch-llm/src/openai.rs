use async_trait::async_trait;
use reqwest::Client;

use dispatch_core::{Message, ToolSchema};

use crate::compat::{build_request_body, parse_sse_data};
use crate::provider::{LlmError, LlmProvider, LlmStream, Result};
use crate::sse::llm_stream_from_sse;
use crate::types::LlmChunk;

/// Provider for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_ms: u64,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 120_000,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overall request timeout, covering the whole streamed response.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        max_output_tokens: Option<u32>,
    ) -> Result<LlmStream> {
        let body = build_request_body(&self.model, messages, tools, max_output_tokens);

        log::debug!(
            "LLM request: model={} messages={} tools={}",
            self.model,
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(tokio::time::Duration::from_millis(self.timeout_ms))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(LlmError::Api(format!("HTTP {}: {}", status, text)));
        }

        let stream = llm_stream_from_sse(response, |_event, data| {
            if data.trim().is_empty() {
                return Ok(None);
            }

            parse_sse_data(data).map(Some)
        });

        Ok(stream)
    }
}
