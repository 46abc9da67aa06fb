//! Error types for the codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the turn-level
//! error that reaches the caller of the orchestrator.

use thiserror::Error;

/// The top-level error type for all codewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model client (transport) errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Remote tool backend errors ---
    #[error("Remote tool error: {0}")]
    Remote(#[from] RemoteError),

    // --- Configuration errors ---
    #[error("Duplicate tool name '{name}' across tool sources")]
    DuplicateTool { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Turn control ---
    #[error("Turn cancelled")]
    Cancelled,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a configuration problem that must abort startup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::DuplicateTool { .. } | Error::Config { .. })
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the model endpoint.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The model answered with neither text nor tool calls
    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

/// Failures of a single tool invocation. These never abort a turn.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Remote tool call failed: {0}")]
    Remote(String),
}

/// Failures of a remote tool backend as a whole (listing, connection).
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Server '{0}' is not connected")]
    NotConnected(String),

    #[error("Server '{server}' transport error: {reason}")]
    Transport { server: String, reason: String },

    #[error("Server '{server}' timed out after {timeout_secs}s")]
    Timeout { server: String, timeout_secs: u64 },

    #[error("Server '{server}' handshake failed: {reason}")]
    Handshake { server: String, reason: String },
}
