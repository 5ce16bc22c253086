use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use async_trait::async_trait;
use dispatch_core::{ToolDispatcher, ToolSchema};

use crate::catalog::ToolCatalog;
use crate::config::McpConfig;
use crate::error::{McpError, Result};
use crate::protocol::client::McpProtocolClient;
use crate::translate::translate_catalog;
use crate::transport::{HttpSseTransport, McpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    Reconnecting,
    ShuttingDown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Reconnecting => "reconnecting",
            SessionState::ShuttingDown => "shutting_down",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub connected: bool,
    pub server_url: String,
    pub tools_available: usize,
    pub tools: Vec<String>,
    pub tool_usage_stats: HashMap<String, u64>,
}

type TransportFactory = Box<dyn Fn() -> Box<dyn McpTransport> + Send + Sync>;

/// One long-lived MCP session.
///
/// Owns the protocol client, the tool catalog, and the connection state
/// machine. The whole connect sequence runs under `connect_lock`, so
/// concurrent [`initialize`] calls collapse into a single attempt; the state
/// word itself is a sync lock and is never held across an await.
///
/// [`initialize`]: McpSession::initialize
pub struct McpSession {
    config: McpConfig,
    state: RwLock<SessionState>,
    connect_lock: Mutex<()>,
    client: tokio::sync::RwLock<Option<McpProtocolClient>>,
    catalog: Arc<ToolCatalog>,
    transport_factory: TransportFactory,
}

impl McpSession {
    pub fn new(config: McpConfig) -> Self {
        let url = config.server_url.clone();
        let connect_timeout_ms = config.connect_timeout_ms;
        Self::with_transport_factory(
            config,
            Box::new(move || Box::new(HttpSseTransport::new(url.clone(), connect_timeout_ms))),
        )
    }

    pub fn with_transport_factory(config: McpConfig, transport_factory: TransportFactory) -> Self {
        Self {
            config,
            state: RwLock::new(SessionState::Disconnected),
            connect_lock: Mutex::new(()),
            client: tokio::sync::RwLock::new(None),
            catalog: Arc::new(ToolCatalog::new()),
            transport_factory,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn catalog(&self) -> Arc<ToolCatalog> {
        self.catalog.clone()
    }

    pub async fn is_connected(&self) -> bool {
        if *self.state.read() != SessionState::Ready {
            return false;
        }
        match self.client.read().await.as_ref() {
            Some(client) => client.is_connected().await,
            None => false,
        }
    }

    /// Connect, perform the MCP handshake, and load the tool catalog.
    ///
    /// Idempotent: on an already-connected session this returns immediately.
    /// Failed attempts are retried with a growing delay; when all attempts
    /// are spent the session is left disconnected and an error is returned.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.connect_lock.lock().await;

        if self.is_connected().await {
            return Ok(());
        }

        {
            let mut state = self.state.write();
            if *state != SessionState::Reconnecting {
                *state = SessionState::Connecting;
            }
        }

        let mut last_error = None;
        for attempt in 1..=self.config.retry_attempts {
            if attempt > 1 {
                let delay_ms = self.config.retry_delay_ms * (attempt as u64 - 1);
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }

            if *self.state.read() == SessionState::ShuttingDown {
                return Err(McpError::Connection("session is shutting down".to_string()));
            }

            match self.try_connect().await {
                Ok(()) => {
                    *self.state.write() = SessionState::Ready;
                    info!(
                        "MCP session ready: {} ({} tools)",
                        self.config.server_url,
                        self.catalog.len()
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "MCP connect attempt {}/{} failed: {}",
                        attempt, self.config.retry_attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        *self.state.write() = SessionState::Disconnected;
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(McpError::Connection(format!(
            "failed to connect to {} after {} attempts: {}",
            self.config.server_url, self.config.retry_attempts, detail
        )))
    }

    async fn try_connect(&self) -> Result<()> {
        let transport = (self.transport_factory)();
        let mut client = McpProtocolClient::new(transport);
        client.connect().await?;

        let init = client.initialize(self.config.connect_timeout_ms).await?;
        info!(
            "MCP handshake complete: {} v{}",
            init.server_info.name, init.server_info.version
        );

        let tools = client.list_tools(self.config.call_timeout_ms).await?;
        self.catalog.replace(translate_catalog(&tools));

        *self.client.write().await = Some(client);
        Ok(())
    }

    /// Re-list the server's tools into the catalog. Usage counters survive.
    pub async fn refresh_tools(&self) -> Result<usize> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(McpError::Disconnected)?;
        let tools = client.list_tools(self.config.call_timeout_ms).await?;
        let schemas = translate_catalog(&tools);
        let count = schemas.len();
        self.catalog.replace(schemas);
        Ok(count)
    }

    /// Invoke a tool and return its rendered text output.
    ///
    /// A disconnected session is connected first. If the invocation fails
    /// with a transport-level fault the session reconnects and retries the
    /// call exactly once; a second failure is reported to the caller.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        if !self.is_connected().await {
            self.initialize().await?;
        }

        match self.invoke(name, arguments.clone()).await {
            Ok(text) => {
                self.catalog.record_use(name);
                Ok(text)
            }
            Err(e) if e.is_transport_fault() => {
                warn!("Transport fault during '{}': {}; reconnecting", name, e);
                self.begin_reconnect().await;
                self.initialize().await?;

                let text = self.invoke(name, arguments).await?;
                self.catalog.record_use(name);
                Ok(text)
            }
            Err(e) => Err(e),
        }
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<String> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(McpError::Disconnected)?;
        let result = client
            .call_tool(name, arguments, self.config.call_timeout_ms)
            .await?;

        if result.is_error {
            Err(McpError::ToolExecution(result.rendered_text()))
        } else {
            Ok(result.rendered_text())
        }
    }

    async fn begin_reconnect(&self) {
        *self.state.write() = SessionState::Reconnecting;
        if let Some(mut client) = self.client.write().await.take() {
            let _ = client.disconnect().await;
        }
    }

    /// Tear the session down. The catalog listing is emptied; usage counters
    /// are kept for a later reconnect.
    pub async fn shutdown(&self) {
        *self.state.write() = SessionState::ShuttingDown;

        if let Some(mut client) = self.client.write().await.take() {
            if let Err(e) = client.disconnect().await {
                warn!("Error during MCP disconnect: {}", e);
            }
        }

        self.catalog.clear();
        *self.state.write() = SessionState::Disconnected;
        info!("MCP session shut down");
    }

    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            connected: self.is_connected().await,
            server_url: self.config.server_url.clone(),
            tools_available: self.catalog.len(),
            tools: self.catalog.tool_names(),
            tool_usage_stats: self.catalog.usage_stats(),
        }
    }
}

#[async_trait]
impl ToolDispatcher for McpSession {
    async fn dispatch(&self, name: &str, args: Value) -> dispatch_core::Result<String> {
        self.call_tool(name, args).await.map_err(Into::into)
    }

    fn available_tools(&self) -> Vec<ToolSchema> {
        self.catalog.snapshot().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Scripted in-memory transport answering JSON-RPC requests directly.
    struct FakeScript {
        /// Fail this many connect attempts before succeeding.
        connect_failures: AtomicUsize,
        connects: AtomicUsize,
        /// Answer this many tools/call requests with a connection error.
        call_faults: AtomicUsize,
        calls: AtomicUsize,
        /// Answer tools/call with an is_error result when true.
        tool_reports_error: AtomicBool,
        tools: Vec<Value>,
    }

    impl FakeScript {
        fn new(tools: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                connect_failures: AtomicUsize::new(0),
                connects: AtomicUsize::new(0),
                call_faults: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                tool_reports_error: AtomicBool::new(false),
                tools,
            })
        }
    }

    struct FakeTransport {
        script: Arc<FakeScript>,
        connected: Arc<AtomicBool>,
        inbound_tx: mpsc::UnboundedSender<String>,
        inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    }

    impl FakeTransport {
        fn new(script: Arc<FakeScript>) -> Self {
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            Self {
                script,
                connected: Arc::new(AtomicBool::new(false)),
                inbound_tx,
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            }
        }

        fn respond(&self, id: u64, result: Value) {
            let response = json!({ "jsonrpc": "2.0", "id": id, "result": result });
            let _ = self.inbound_tx.send(response.to_string());
        }
    }

    #[async_trait]
    impl McpTransport for FakeTransport {
        async fn connect(&mut self) -> Result<()> {
            self.script.connects.fetch_add(1, Ordering::SeqCst);
            if self.script.connect_failures.load(Ordering::SeqCst) > 0 {
                self.script.connect_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(McpError::Connection("connection refused".to_string()));
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, message: String) -> Result<()> {
            let request: Value = serde_json::from_str(&message)?;
            let method = request["method"].as_str().unwrap_or_default();
            let Some(id) = request["id"].as_u64() else {
                // Notification; nothing to answer.
                return Ok(());
            };

            match method {
                "initialize" => self.respond(
                    id,
                    json!({
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "serverInfo": { "name": "fake-mcp", "version": "0.1.0" }
                    }),
                ),
                "tools/list" => self.respond(id, json!({ "tools": self.script.tools })),
                "tools/call" => {
                    self.script.calls.fetch_add(1, Ordering::SeqCst);
                    if self.script.call_faults.load(Ordering::SeqCst) > 0 {
                        self.script.call_faults.fetch_sub(1, Ordering::SeqCst);
                        let response = json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "error": { "code": -32000, "message": "connection reset by peer" }
                        });
                        let _ = self.inbound_tx.send(response.to_string());
                    } else if self.script.tool_reports_error.load(Ordering::SeqCst) {
                        self.respond(
                            id,
                            json!({
                                "content": [{ "type": "text", "text": "bad input" }],
                                "isError": true
                            }),
                        );
                    } else {
                        self.respond(
                            id,
                            json!({ "content": [{ "type": "text", "text": "ok" }] }),
                        );
                    }
                }
                other => panic!("unexpected method: {other}"),
            }
            Ok(())
        }

        async fn receive(&self) -> Result<Option<String>> {
            let mut rx = self.inbound_rx.lock().await;
            match tokio::time::timeout(tokio::time::Duration::from_millis(10), rx.recv()).await {
                Ok(Some(message)) => Ok(Some(message)),
                Ok(None) => Err(McpError::Disconnected),
                Err(_) => Ok(None),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    fn fast_config() -> McpConfig {
        McpConfig {
            server_url: "http://fake:9000/sse".to_string(),
            connect_timeout_ms: 1_000,
            retry_attempts: 3,
            retry_delay_ms: 1,
            call_timeout_ms: 1_000,
        }
    }

    fn session_with(script: Arc<FakeScript>, config: McpConfig) -> McpSession {
        McpSession::with_transport_factory(
            config,
            Box::new(move || Box::new(FakeTransport::new(script.clone()))),
        )
    }

    fn add_tool() -> Value {
        json!({
            "name": "add",
            "description": "Add numbers",
            "inputSchema": { "type": "object", "properties": { "a": {}, "b": {} } }
        })
    }

    #[tokio::test]
    async fn initialize_loads_catalog() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());

        session.initialize().await.unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.is_connected().await);
        assert_eq!(session.catalog().tool_names(), vec!["add"]);
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());

        session.initialize().await.unwrap();
        session.initialize().await.unwrap();

        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_initialize_connects_once() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = Arc::new(session_with(script.clone(), fast_config()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { session.initialize().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_retries_failed_connects() {
        let script = FakeScript::new(vec![add_tool()]);
        script.connect_failures.store(2, Ordering::SeqCst);
        let session = session_with(script.clone(), fast_config());

        session.initialize().await.unwrap();

        assert_eq!(script.connects.load(Ordering::SeqCst), 3);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn initialize_gives_up_after_all_attempts() {
        let script = FakeScript::new(vec![add_tool()]);
        script.connect_failures.store(10, Ordering::SeqCst);
        let session = session_with(script.clone(), fast_config());

        let err = session.initialize().await.unwrap_err();
        assert!(matches!(err, McpError::Connection(_)));
        assert_eq!(script.connects.load(Ordering::SeqCst), 3);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn call_tool_connects_lazily_and_counts_use() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());

        let text = session.call_tool("add", json!({ "a": 2, "b": 3 })).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(session.catalog().usage_count("add"), 1);
    }

    #[tokio::test]
    async fn transport_fault_reconnects_and_retries_once() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());
        session.initialize().await.unwrap();

        script.call_faults.store(1, Ordering::SeqCst);
        let text = session.call_tool("add", json!({})).await.unwrap();

        assert_eq!(text, "ok");
        // One reconnect on top of the original connect, two call attempts.
        assert_eq!(script.connects.load(Ordering::SeqCst), 2);
        assert_eq!(script.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.catalog().usage_count("add"), 1);
    }

    #[tokio::test]
    async fn second_transport_fault_surfaces_as_tool_execution_error() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());
        session.initialize().await.unwrap();

        // Both the original call and the post-reconnect retry fault.
        script.call_faults.store(2, Ordering::SeqCst);
        let err = session.dispatch("add", json!({})).await.unwrap_err();

        assert_eq!(err.kind(), "MCPToolExecutionError");
        assert_eq!(script.connects.load(Ordering::SeqCst), 2);
        assert_eq!(script.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.catalog().usage_count("add"), 0);
    }

    #[tokio::test]
    async fn tool_error_result_does_not_reconnect_or_count() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());
        session.initialize().await.unwrap();

        script.tool_reports_error.store(true, Ordering::SeqCst);
        let err = session.call_tool("add", json!({})).await.unwrap_err();

        assert!(matches!(err, McpError::ToolExecution(ref m) if m == "bad input"));
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
        assert_eq!(session.catalog().usage_count("add"), 0);
    }

    #[tokio::test]
    async fn shutdown_empties_catalog_but_keeps_counters() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());
        session.initialize().await.unwrap();
        session.call_tool("add", json!({})).await.unwrap();

        session.shutdown().await;

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.catalog().is_empty());
        assert_eq!(session.catalog().usage_count("add"), 1);
    }

    #[tokio::test]
    async fn stats_report_catalog_and_usage() {
        let script = FakeScript::new(vec![add_tool()]);
        let session = session_with(script.clone(), fast_config());
        session.initialize().await.unwrap();
        session.call_tool("add", json!({})).await.unwrap();

        let stats = session.stats().await;
        assert!(stats.connected);
        assert_eq!(stats.tools_available, 1);
        assert_eq!(stats.tool_usage_stats.get("add"), Some(&1));
    }
}
