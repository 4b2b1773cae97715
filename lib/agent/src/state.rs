//! Loop states.

use std::fmt;
use ticker_agent_conversation::Turn;

/// Where a run is in the model/tool cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Ask the model for its next turn.
    Model,
    /// Execute the tool calls of the last assistant turn.
    ToolExec,
    /// The last assistant turn is the answer.
    Done,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::ToolExec => write!(f, "tool_exec"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Picks the state that follows an assistant turn.
#[must_use]
pub fn should_continue(turn: &Turn) -> LoopState {
    if turn.has_tool_calls() {
        LoopState::ToolExec
    } else {
        LoopState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ticker_agent_conversation::ToolCallRequest;

    #[test]
    fn answer_without_tools_is_done() {
        let turn = Turn::assistant("AAPL is at $1.00.", vec![]);
        assert_eq!(should_continue(&turn), LoopState::Done);
    }

    #[test]
    fn tool_calls_continue() {
        let call = ToolCallRequest::new("c1", "get_realtime_price", json!({"symbol": "AAPL"}));
        let turn = Turn::assistant("", vec![call]);
        assert_eq!(should_continue(&turn), LoopState::ToolExec);
    }
}
