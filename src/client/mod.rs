// src/client/mod.rs
// MCP client for the Lingshu tool server, plus the demo and ask flows

pub mod agent;
pub mod demo;

pub use agent::{AskOutcome, ask, mcp_tools_to_functions};
pub use demo::{DemoFailure, DemoOptions, DemoReport, DemoRunner, DemoStep, StepOutcome};

use crate::error::{ErrorKind, LingshuError, Result};
use crate::tools::{ToolDispatcher, ToolResult};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo};
use rmcp::service::RunningService;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::{RoleClient, serve_client};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on one MCP tool call, above the backend's own timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can execute a named tool and return its envelope.
///
/// Implemented by the remote MCP client and by the in-process dispatcher,
/// so the demo flow runs against either.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult;
}

#[async_trait]
impl ToolInvoker for ToolDispatcher {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        self.invoke(name, Some(arguments)).await
    }
}

/// Connected MCP streamable-HTTP session
pub struct McpToolClient {
    url: String,
    call_timeout: Duration,
    /// Dropping this cancels the transport
    service: RunningService<RoleClient, ClientInfo>,
}

impl McpToolClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: rmcp::model::Implementation {
                name: "lingshu-client".into(),
                title: Some("Lingshu MCP Client".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
        };

        let config = StreamableHttpClientTransportConfig::with_uri(url);
        let transport = StreamableHttpClientTransport::from_config(config);
        let service = serve_client(client_info, transport).await.map_err(|e| {
            LingshuError::Transport(format!("failed to connect to MCP server at {}: {}", url, e))
        })?;

        info!(url = %url, "Connected to MCP server");
        Ok(Self {
            url: url.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            service,
        })
    }

    /// Bound each tool call; an expired call is reported as BackendUnavailable
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn list_tools(&self) -> Result<Vec<rmcp::model::Tool>> {
        self.service
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| LingshuError::Transport(format!("failed to list tools: {}", e)))
    }

    /// Call a tool and decode its ToolResult. Transport failures come back as
    /// `BackendUnavailable` results.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        let request = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };

        let response = tokio::time::timeout(self.call_timeout, self.service.peer().call_tool(request)).await;
        match response {
            Ok(Ok(result)) => decode_tool_result(name, &result),
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "MCP tool call failed");
                ToolResult::error(name, Some(ErrorKind::BackendUnavailable), format!("MCP call failed: {}", e))
            }
            Err(_) => ToolResult::error(
                name,
                Some(ErrorKind::BackendUnavailable),
                format!("MCP call timed out after {}s", self.call_timeout.as_secs()),
            ),
        }
    }

    /// Close the session
    pub async fn shutdown(self) {
        info!(url = %self.url, "Disconnecting from MCP server");
        if let Err(e) = self.service.cancel().await {
            warn!(error = %e, "MCP client did not shut down cleanly");
        }
    }
}

#[async_trait]
impl ToolInvoker for McpToolClient {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        McpToolClient::call_tool(self, name, arguments).await
    }
}

/// Decode the ToolResult JSON carried in a CallToolResult's text content
pub fn decode_tool_result(tool: &str, result: &CallToolResult) -> ToolResult {
    let text: String = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.to_string()))
        .collect::<Vec<_>>()
        .join("\n");

    match serde_json::from_str::<ToolResult>(&text) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(tool, error = %e, "Tool response is not a ToolResult envelope");
            if result.is_error == Some(true) {
                ToolResult::error(tool, None, text)
            } else if text.trim().is_empty() {
                ToolResult::error(tool, Some(ErrorKind::EmptyResponse), "tool returned no content")
            } else {
                ToolResult::success(tool, text)
            }
        }
    }
}
