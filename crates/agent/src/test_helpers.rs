//! Shared test doubles for the agent crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use codewright_core::error::{ProviderError, RemoteError, ToolError};
use codewright_core::message::{Message, MessageToolCall};
use codewright_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use codewright_core::remote::RemoteToolBackend;
use codewright_core::tool::{Tool, ToolDescriptor, ToolOrigin, ToolResult};

/// A provider that replays a fixed script of replies.
///
/// Once the script runs out it keeps returning the `repeat` reply if one
/// was given, and a 500 otherwise. Every request is recorded.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    repeat: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ProviderResponse>) -> Self {
        Self::with_results(script.into_iter().map(Ok).collect())
    }

    pub fn with_results(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every request with the same reply.
    pub fn always(reply: ProviderResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(reply) => Ok(reply.clone()),
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            }),
        }
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A final text reply.
pub fn text_reply(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A reply requesting the given tool calls, with no text.
pub fn tool_reply(calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls("", calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(arguments["text"].as_str().unwrap_or_default()))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "explode"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "explode".into(),
            reason: "kaboom".into(),
        })
    }
}

/// Sleeps for `ms` milliseconds, then reports how long it slept.
pub struct SleepyTool;

#[async_trait]
impl Tool for SleepyTool {
    fn name(&self) -> &str {
        "sleepy"
    }
    fn description(&self) -> &str {
        "Sleeps for a while"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "ms": { "type": "integer" } }
        })
    }
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let ms = arguments["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ToolResult::ok(format!("slept {ms}")))
    }
}

enum Listing {
    Tools(Vec<ToolDescriptor>),
    Failing,
    Slow(Duration),
}

/// A remote backend with a fixed listing. Calls answer `remote:<name>`.
pub struct MockRemote {
    listing: Mutex<Listing>,
    fail_calls: bool,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    fn from_listing(listing: Listing) -> Self {
        Self {
            listing: Mutex::new(listing),
            fail_calls: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self::from_listing(Listing::Tools(tools))
    }

    /// Listing always fails with a transport error.
    pub fn failing() -> Self {
        Self::from_listing(Listing::Failing)
    }

    /// Listing takes `delay` before returning nothing.
    pub fn slow(delay: Duration) -> Self {
        Self::from_listing(Listing::Slow(delay))
    }

    /// Every call fails with a remote error.
    pub fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Replace the listing, as a server would between requests.
    pub fn set_tools(&self, tools: Vec<ToolDescriptor>) {
        *self.listing.lock().unwrap() = Listing::Tools(tools);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteToolBackend for MockRemote {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, RemoteError> {
        let delay = match &*self.listing.lock().unwrap() {
            Listing::Tools(tools) => return Ok(tools.clone()),
            Listing::Failing => {
                return Err(RemoteError::Transport {
                    server: "mock".into(),
                    reason: "unreachable".into(),
                });
            }
            Listing::Slow(delay) => *delay,
        };
        tokio::time::sleep(delay).await;
        Ok(Vec::new())
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail_calls {
            return Err(ToolError::Remote(format!("{name}: connection reset")));
        }
        Ok(ToolResult::ok(format!("remote:{name}")))
    }
}

/// A remote descriptor with an empty object schema.
pub fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.into(),
        description: format!("{name} (mock)"),
        parameters: serde_json::json!({ "type": "object", "properties": {} }),
        origin: ToolOrigin::Remote,
    }
}
