use serde::{Deserialize, Serialize};

/// Connection settings for the upstream MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Upstream MCP endpoint URL.
    pub server_url: String,
    /// Per-attempt connection/initialize timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Maximum initialize attempts before giving up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Backoff base in milliseconds; attempt n sleeps `retry_delay_ms * n`.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Per tool-call timeout in milliseconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2_000
}

fn default_call_timeout() -> u64 {
    30_000
}

impl McpConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            connect_timeout_ms: default_connect_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            call_timeout_ms: default_call_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_documented_values() {
        let config = McpConfig::new("http://localhost:9000/sse");
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 2_000);
        assert_eq!(config.call_timeout_ms, 30_000);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: McpConfig =
            serde_json::from_str(r#"{"server_url":"http://mcp:9000","retry_attempts":5}"#).unwrap();
        assert_eq!(config.server_url, "http://mcp:9000");
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_delay_ms, 2_000);
    }
}
