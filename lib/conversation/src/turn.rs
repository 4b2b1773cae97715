//! Turn types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use ticker_agent_core::TurnId;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// The caller's query.
    User,
    /// A reply from the model.
    Assistant,
    /// The text returned by a tool call.
    ToolResult,
}

impl TurnRole {
    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolResult => "tool_result",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a conversation.
///
/// Turns have no mutating methods; once appended to a
/// [`ConversationState`](crate::ConversationState) they are only handed out
/// by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier.
    pub id: TurnId,
    /// Who produced the turn.
    pub role: TurnRole,
    /// Text content, possibly empty.
    pub content: String,
    /// Tool calls requested by the model (assistant turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// The tool call this turn answers (tool-result turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this result (tool-result turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// When the turn was created.
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Creates an assistant turn with the given tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        let mut turn = Self::new(TurnRole::Assistant, content);
        turn.tool_calls = tool_calls;
        turn
    }

    /// Creates a tool-result turn answering `call`.
    #[must_use]
    pub fn tool_result(call: &ToolCallRequest, content: impl Into<String>) -> Self {
        let mut turn = Self::new(TurnRole::ToolResult, content);
        turn.tool_call_id = Some(call.id.clone());
        turn.tool_name = Some(call.name.clone());
        turn
    }

    /// Returns true if this turn requests tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Returns true if the turn carries non-blank text.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned identifier used to match the result back.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: JsonValue,
}

impl ToolCallRequest {
    /// Creates a new tool call request.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}
