//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConversationError`: Violations of the turn ordering rules
//! - `ToolError`: Tool lookup, registration and argument failures

use crate::turn::TurnRole;
use std::fmt;

/// Errors from appending turns to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A user turn was appended after the conversation was seeded.
    UnexpectedUserTurn,
    /// An assistant turn was appended while tool calls were still unanswered.
    PendingToolCalls { pending: usize },
    /// A tool result did not answer the next outstanding tool call.
    UnexpectedToolResult {
        expected: Option<String>,
        actual: Option<String>,
    },
    /// A turn carried fields that do not belong to its role.
    MalformedTurn { role: TurnRole, reason: String },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedUserTurn => {
                write!(f, "a conversation holds exactly one user turn")
            }
            Self::PendingToolCalls { pending } => {
                write!(f, "{pending} tool call(s) are still waiting for results")
            }
            Self::UnexpectedToolResult { expected, actual } => write!(
                f,
                "tool result for {} does not answer the next tool call ({})",
                actual.as_deref().unwrap_or("<none>"),
                expected.as_deref().unwrap_or("none outstanding")
            ),
            Self::MalformedTurn { role, reason } => {
                write!(f, "malformed {role} turn: {reason}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

/// Errors from tool registration and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool not found.
    NotFound { name: String },
    /// A tool with this name is already registered.
    Duplicate { name: String },
    /// Invalid tool input.
    InvalidInput { name: String, reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "tool not found: {name}"),
            Self::Duplicate { name } => write!(f, "tool already registered: {name}"),
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}
