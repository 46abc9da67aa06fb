//! Remote tool backends.
//!
//! A remote backend exposes tools that run outside this process and are
//! discovered dynamically by listing. The listing can change between calls.

use async_trait::async_trait;

use crate::error::{RemoteError, ToolError};
use crate::tool::{ToolDescriptor, ToolResult};

#[async_trait]
pub trait RemoteToolBackend: Send + Sync {
    /// A short label for logs (e.g. "mcp").
    fn name(&self) -> &str;

    /// The tools currently offered. Descriptors carry
    /// [`ToolOrigin::Remote`](crate::tool::ToolOrigin::Remote).
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, RemoteError>;

    /// Invoke a remote tool by its model-facing name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError>;
}
