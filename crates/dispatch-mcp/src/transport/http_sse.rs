use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{McpError, Result};
use crate::transport::McpTransport;

/// HTTP transport: a long-lived SSE GET for inbound messages, POST for
/// outbound requests.
///
/// The server announces the POST endpoint via an `endpoint` SSE event; until
/// (or unless) one arrives, `{base}/message` is used.
pub struct HttpSseTransport {
    url: String,
    connect_timeout_ms: u64,
    client: Client,
    connected: Arc<AtomicBool>,
    message_tx: mpsc::Sender<String>,
    message_rx: Mutex<mpsc::Receiver<String>>,
    endpoint_url: Arc<Mutex<Option<String>>>,
    sse_handle: Option<tokio::task::JoinHandle<()>>,
}

impl HttpSseTransport {
    pub fn new(url: impl Into<String>, connect_timeout_ms: u64) -> Self {
        let (message_tx, message_rx) = mpsc::channel(100);
        Self {
            url: url.into(),
            connect_timeout_ms,
            client: Client::new(),
            connected: Arc::new(AtomicBool::new(false)),
            message_tx,
            message_rx: Mutex::new(message_rx),
            endpoint_url: Arc::new(Mutex::new(None)),
            sse_handle: None,
        }
    }

    fn default_post_url(&self) -> String {
        format!("{}/message", self.url.trim_end_matches("/sse"))
    }
}

#[async_trait]
impl McpTransport for HttpSseTransport {
    async fn connect(&mut self) -> Result<()> {
        info!("Connecting to MCP SSE endpoint: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .timeout(tokio::time::Duration::from_millis(self.connect_timeout_ms))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(McpError::Connection(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let message_tx = self.message_tx.clone();
        let endpoint_url = self.endpoint_url.clone();
        let connected = self.connected.clone();
        let url = self.url.clone();

        let handle = tokio::spawn(async move {
            let mut stream = response.bytes_stream().eventsource();
            while let Some(event) = stream.next().await {
                match event {
                    Ok(event) => {
                        if event.event == "endpoint" {
                            debug!("Got message endpoint: {}", event.data);
                            *endpoint_url.lock().await = Some(event.data);
                        } else if event.event == "message" || event.event.is_empty() {
                            if message_tx.send(event.data).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("SSE stream error: {}", e);
                        break;
                    }
                }
            }
            warn!("SSE stream ended for {}", url);
            connected.store(false, Ordering::SeqCst);
        });

        self.sse_handle = Some(handle);
        self.connected.store(true, Ordering::SeqCst);

        info!("MCP SSE transport connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!("Disconnecting MCP SSE transport");

        self.connected.store(false, Ordering::SeqCst);

        if let Some(handle) = self.sse_handle.take() {
            handle.abort();
        }

        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
        if !self.is_connected() {
            return Err(McpError::Disconnected);
        }

        let endpoint = self.endpoint_url.lock().await.clone();
        let post_url = endpoint.unwrap_or_else(|| self.default_post_url());

        let response = self
            .client
            .post(&post_url)
            .header("Content-Type", "application/json")
            .body(message)
            .timeout(tokio::time::Duration::from_secs(60))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "POST failed: {} - {}",
                status, body
            )));
        }

        debug!("Sent message via POST to {}", post_url);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<String>> {
        if !self.is_connected() {
            return Err(McpError::Disconnected);
        }

        let mut rx = self.message_rx.lock().await;
        match tokio::time::timeout(tokio::time::Duration::from_millis(100), rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => {
                warn!("SSE message channel closed");
                Err(McpError::Disconnected)
            }
            // Timeout: nothing pending.
            Err(_) => Ok(None),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_post_url_strips_sse_suffix() {
        let transport = HttpSseTransport::new("http://mcp:9000/sse", 10_000);
        assert_eq!(transport.default_post_url(), "http://mcp:9000/message");

        let transport = HttpSseTransport::new("http://mcp:9000", 10_000);
        assert_eq!(transport.default_post_url(), "http://mcp:9000/message");
    }

    #[tokio::test]
    async fn send_before_connect_reports_disconnected() {
        let transport = HttpSseTransport::new("http://mcp:9000/sse", 10_000);
        let result = transport.send("{}".to_string()).await;
        assert!(matches!(result, Err(McpError::Disconnected)));
    }
}
