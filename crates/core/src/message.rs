//! Message and Conversation domain types.
//!
//! A [`Conversation`] is the append-only log the orchestrator replays to the
//! model on every round-trip. The model endpoint is stateless between calls, so
//! the order of this log is the only context it ever sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content. Empty for assistant messages that only carry tool calls.
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (tool name, error flag, provider info)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        let mut message = Self::with_role(Role::Assistant, content.into());
        message.tool_calls = tool_calls;
        message
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut message = Self::with_role(Role::Tool, content.into());
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Whether this is an assistant message that requests tools.
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call within its assistant message
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as the raw JSON string the model produced
    pub arguments: String,
}

/// The conversation store: an ordered, append-only sequence of messages.
///
/// Insertion order is chronological order is replay order. Nothing here
/// reorders, rewrites or removes a message once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,

    /// Set once the system prompt decision has been made for this conversation.
    #[serde(default)]
    system_seeded: bool,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            system_seeded: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the end of the conversation.
    pub fn append(&mut self, message: Message) {
        debug_assert!(
            message.role != Role::Tool || message.tool_call_id.is_some(),
            "tool message without tool_call_id"
        );
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Append the system prompt if this is the first time the conversation is
    /// seeded and nothing has been appended yet.
    ///
    /// Only the first call can append; later calls are no-ops even if the
    /// conversation happens to be empty. Returns whether a message was appended.
    pub fn seed_system_prompt(&mut self, prompt: impl Into<String>) -> bool {
        if self.system_seeded {
            return false;
        }
        self.system_seeded = true;
        if !self.messages.is_empty() {
            return false;
        }
        self.append(Message::system(prompt));
        true
    }

    /// The full ordered history, as it stands right now.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the messages without cloning.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The last message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// IDs of tool calls that are not answered by the tool messages directly
    /// following their assistant message.
    ///
    /// An empty result means every assistant tool-call message is followed by
    /// exactly one tool message per call, in emission order.
    pub fn unanswered_tool_calls(&self) -> Vec<String> {
        let mut missing = Vec::new();
        let mut i = 0;
        while i < self.messages.len() {
            let message = &self.messages[i];
            i += 1;
            if !message.has_tool_calls() {
                continue;
            }
            for call in &message.tool_calls {
                let answered = self
                    .messages
                    .get(i)
                    .filter(|m| m.role == Role::Tool)
                    .is_some_and(|m| m.tool_call_id.as_deref() == Some(call.id.as_str()));
                if answered {
                    i += 1;
                } else {
                    missing.push(call.id.clone());
                }
            }
        }
        missing
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
