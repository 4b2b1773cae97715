//! Error types for the control loop.

use std::fmt;

/// Errors that end an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The query has no text.
    EmptyQuery,
    /// The model called a tool that is not registered.
    UnknownTool { name: String },
    /// The model called a tool with arguments it does not accept.
    InvalidToolArguments { name: String, reason: String },
    /// The model call failed.
    Model { reason: String },
    /// The model was still requesting tools after the last allowed call.
    MaxIterationsExceeded { max: u32 },
    /// A turn could not be appended to the conversation.
    Conversation { reason: String },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "query must not be empty"),
            Self::UnknownTool { name } => write!(f, "model requested unknown tool: {name}"),
            Self::InvalidToolArguments { name, reason } => {
                write!(f, "invalid arguments for tool '{name}': {reason}")
            }
            Self::Model { reason } => write!(f, "model call failed: {reason}"),
            Self::MaxIterationsExceeded { max } => {
                write!(f, "exceeded {max} model iterations without a final answer")
            }
            Self::Conversation { reason } => write!(f, "conversation error: {reason}"),
        }
    }
}

impl std::error::Error for AgentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_display() {
        let err = AgentError::MaxIterationsExceeded { max: 10 };
        assert!(err.to_string().contains("10"));

        let err = AgentError::UnknownTool {
            name: "get_weather".to_string(),
        };
        assert_eq!(err.to_string(), "model requested unknown tool: get_weather");
    }
}
