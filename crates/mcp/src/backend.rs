use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use codewright_config::{McpServerConfig, McpTransport};
use codewright_core::error::{RemoteError, ToolError};
use codewright_core::remote::RemoteToolBackend;
use codewright_core::tool::{ToolDescriptor, ToolOrigin, ToolResult};
use rmcp::ServiceExt;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{IntoTransport, TokioChildProcess};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{parse_call_result, qualify, split_qualified};

/// A live connection to one MCP server.
struct McpConnection {
    service: RunningService<RoleClient, ()>,
    timeout: Duration,
}

/// Remote tool backend over one or more MCP servers.
///
/// Tools are exposed to the model as `<server>__<tool>`. The tool list is
/// fetched live on every [`list_tools`](RemoteToolBackend::list_tools) call.
pub struct McpBackend {
    connections: RwLock<BTreeMap<String, McpConnection>>,
    /// qualified name -> (server, tool) from the last listing
    routes: RwLock<HashMap<String, (String, String)>>,
}

impl Default for McpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl McpBackend {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(BTreeMap::new()),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Connect every enabled server. Servers that fail are logged and skipped.
    ///
    /// Returns the number of connected servers.
    pub async fn connect_all(&self, servers: &BTreeMap<String, McpServerConfig>) -> usize {
        let mut connected = 0;
        for (name, server) in servers {
            if !server.enabled {
                debug!(server = %name, "MCP server disabled, skipping");
                continue;
            }
            match self.connect(name, server).await {
                Ok(()) => connected += 1,
                Err(e) => warn!(server = %name, error = %e, "MCP server failed to connect"),
            }
        }
        connected
    }

    /// Connect a single configured server.
    pub async fn connect(&self, name: &str, server: &McpServerConfig) -> Result<(), RemoteError> {
        match server.transport {
            McpTransport::Stdio => {
                let command = server.command.as_deref().ok_or_else(|| RemoteError::Handshake {
                    server: name.to_string(),
                    reason: "stdio transport requires 'command'".into(),
                })?;
                self.connect_stdio(name, command, &server.args, &server.env, server.timeout_secs)
                    .await
            }
            McpTransport::Http => {
                let url = server.url.as_deref().ok_or_else(|| RemoteError::Handshake {
                    server: name.to_string(),
                    reason: "http transport requires 'url'".into(),
                })?;
                self.connect_http(name, url, server.timeout_secs).await
            }
        }
    }

    /// Connect to an MCP server by spawning a child process.
    pub async fn connect_stdio(
        &self,
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout_secs: u64,
    ) -> Result<(), RemoteError> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }

        let transport = TokioChildProcess::new(cmd).map_err(|e| RemoteError::Handshake {
            server: name.to_string(),
            reason: format!("failed to spawn '{command}': {e}"),
        })?;

        self.connect_transport(name, transport, timeout_secs).await?;
        info!(server = %name, transport = "stdio", "MCP server connected");
        Ok(())
    }

    /// Connect to an MCP server via HTTP (Streamable HTTP transport).
    #[cfg(feature = "http")]
    pub async fn connect_http(
        &self,
        name: &str,
        url: &str,
        timeout_secs: u64,
    ) -> Result<(), RemoteError> {
        use rmcp::transport::StreamableHttpClientTransport;

        let transport = StreamableHttpClientTransport::from_uri(url);

        self.connect_transport(name, transport, timeout_secs).await?;
        info!(server = %name, transport = "http", "MCP server connected");
        Ok(())
    }

    #[cfg(not(feature = "http"))]
    pub async fn connect_http(
        &self,
        name: &str,
        _url: &str,
        _timeout_secs: u64,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Handshake {
            server: name.to_string(),
            reason: "http transport requires the 'http' feature".into(),
        })
    }

    /// Run the MCP handshake over an already open transport and register
    /// the connection as `name`.
    pub async fn connect_transport<T, E, A>(
        &self,
        name: &str,
        transport: T,
        timeout_secs: u64,
    ) -> Result<(), RemoteError>
    where
        T: IntoTransport<RoleClient, E, A> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = tokio::time::timeout(Duration::from_secs(timeout_secs), ().serve(transport))
            .await
            .map_err(|_| RemoteError::Timeout {
                server: name.to_string(),
                timeout_secs,
            })?
            .map_err(|e| RemoteError::Handshake {
                server: name.to_string(),
                reason: e.to_string(),
            })?;

        self.insert(name, service, timeout_secs).await;
        Ok(())
    }

    async fn insert(&self, name: &str, service: RunningService<RoleClient, ()>, timeout_secs: u64) {
        let previous = self.connections.write().await.insert(
            name.to_string(),
            McpConnection {
                service,
                timeout: Duration::from_secs(timeout_secs),
            },
        );
        if let Some(old) = previous
            && let Err(e) = old.service.cancel().await
        {
            warn!(server = %name, error = %e, "Error cancelling replaced MCP connection");
        }
    }

    /// Names of the connected servers, sorted.
    pub async fn servers(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Disconnect all MCP servers.
    pub async fn disconnect_all(&self) {
        let conns = std::mem::take(&mut *self.connections.write().await);
        self.routes.write().await.clear();
        for (name, conn) in conns {
            info!(server = %name, "Disconnecting MCP server");
            if let Err(e) = conn.service.cancel().await {
                warn!(server = %name, error = %e, "Error cancelling MCP server");
            }
        }
    }

    async fn route(&self, name: &str) -> Option<(String, String)> {
        if let Some(route) = self.routes.read().await.get(name) {
            return Some(route.clone());
        }
        split_qualified(name).map(|(s, t)| (s.to_string(), t.to_string()))
    }
}

#[async_trait]
impl RemoteToolBackend for McpBackend {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, RemoteError> {
        let conns = self.connections.read().await;
        let mut descriptors = Vec::new();
        let mut routes = HashMap::new();

        for (server, conn) in conns.iter() {
            let tools = tokio::time::timeout(conn.timeout, conn.service.list_all_tools())
                .await
                .map_err(|_| RemoteError::Timeout {
                    server: server.clone(),
                    timeout_secs: conn.timeout.as_secs(),
                })?
                .map_err(|e| RemoteError::Transport {
                    server: server.clone(),
                    reason: e.to_string(),
                })?;

            for tool in tools {
                let tool_name = tool.name.to_string();
                let qualified = qualify(server, &tool_name);
                descriptors.push(ToolDescriptor {
                    name: qualified.clone(),
                    description: tool
                        .description
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| format!("{tool_name} (from {server})")),
                    parameters: serde_json::to_value(&*tool.input_schema).unwrap_or_default(),
                    origin: ToolOrigin::Remote,
                });
                routes.insert(qualified, (server.clone(), tool_name));
            }
        }

        debug!(tools = descriptors.len(), servers = conns.len(), "Listed MCP tools");
        *self.routes.write().await = routes;
        Ok(descriptors)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let (server, tool) = self
            .route(name)
            .await
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let conns = self.connections.read().await;
        let conn = conns
            .get(&server)
            .ok_or_else(|| ToolError::Remote(format!("MCP server '{server}' is not connected")))?;

        let params: rmcp::model::CallToolRequestParams = serde_json::from_value(
            serde_json::json!({ "name": tool, "arguments": arguments }),
        )
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        debug!(server = %server, tool = %tool, "Calling MCP tool");

        let result = tokio::time::timeout(conn.timeout, conn.service.call_tool(params))
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: conn.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::Remote(format!("{server}: {e}")))?;

        let value = serde_json::to_value(&result).map_err(|e| ToolError::Remote(e.to_string()))?;
        parse_call_result(name, &value)
    }
}
