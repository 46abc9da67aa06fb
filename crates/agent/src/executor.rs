//! Tool call executor.
//!
//! Turns one model-issued call into exactly one tool-role message. Every
//! failure (bad arguments, unknown tool, tool error, timeout) becomes an
//! error payload the model can read; nothing here aborts a turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use codewright_core::error::ToolError;
use codewright_core::message::{Message, MessageToolCall};
use codewright_core::remote::RemoteToolBackend;
use codewright_core::tool::{ToolCall, ToolOrigin, ToolRegistry, ToolResult};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::surface::{Catalog, ToolRoute};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// The outcome of one tool call.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// The tool-role message answering the call
    pub message: Message,
    pub success: bool,
    pub duration: Duration,
    /// `None` when the name did not resolve
    pub route: Option<ToolRoute>,
}

pub struct ToolExecutor {
    local: Arc<ToolRegistry>,
    remote: Option<Arc<dyn RemoteToolBackend>>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(local: Arc<ToolRegistry>, remote: Option<Arc<dyn RemoteToolBackend>>) -> Self {
        Self {
            local,
            remote,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Bound each tool invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute one call against the given catalog. Never fails.
    pub async fn execute(&self, call: &MessageToolCall, catalog: &Catalog) -> ToolExecution {
        let start = Instant::now();
        let route = catalog.resolve(&call.name).ok();

        let outcome = match ToolCall::decode(call) {
            Ok(decoded) => match route {
                Some(route) => self.dispatch(route, decoded).await,
                None => Err(ToolError::NotFound(call.name.clone())),
            },
            Err(e) => Err(e),
        };

        let duration = start.elapsed();
        let (payload, success) = match outcome {
            Ok(result) if result.success => {
                debug!(tool = %call.name, duration_ms = duration.as_millis() as u64, "Tool succeeded");
                (success_payload(result), true)
            }
            Ok(result) => {
                warn!(tool = %call.name, output = %result.output, "Tool reported failure");
                (error_payload(&result.output), false)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (error_payload(&e.to_string()), false)
            }
        };

        let mut message = Message::tool_result(&call.id, payload.to_string());
        message
            .metadata
            .insert("tool_name".into(), Value::String(call.name.clone()));
        message
            .metadata
            .insert("is_error".into(), Value::Bool(!success));
        if let Some(route) = route {
            message.metadata.insert(
                "origin".into(),
                Value::String(ToolOrigin::from(route).to_string()),
            );
        }

        ToolExecution {
            message,
            success,
            duration,
            route,
        }
    }

    async fn dispatch(&self, route: ToolRoute, call: ToolCall) -> Result<ToolResult, ToolError> {
        let invocation = async {
            match route {
                ToolRoute::Local => self.local.call(&call.name, call.arguments).await,
                ToolRoute::Remote => match &self.remote {
                    Some(remote) => remote.call_tool(&call.name, call.arguments).await,
                    None => Err(ToolError::Remote(format!(
                        "no remote backend for '{}'",
                        call.name
                    ))),
                },
            }
        };

        tokio::time::timeout(self.timeout, invocation)
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::Timeout {
                    tool_name: call.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                })
            })
    }
}

/// `{"status":"success","result":...}`. Structured data wins over the text output.
fn success_payload(result: ToolResult) -> Value {
    let result = result.data.unwrap_or(Value::String(result.output));
    json!({ "status": "success", "result": result })
}

/// `{"status":"error","error":"..."}`.
fn error_payload(reason: &str) -> Value {
    json!({ "status": "error", "error": reason })
}
