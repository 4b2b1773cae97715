//! Conversation state for a single agent run.
//!
//! The state is an append-only turn log. It starts with exactly one user
//! turn, and every assistant turn that requests tools must be followed by
//! one tool-result turn per call, in the order the calls were requested.
//! [`ConversationState::push`] rejects appends that would break either rule.

use crate::error::ConversationError;
use crate::turn::{ToolCallRequest, Turn, TurnRole};
use rootcause::Report;
use serde::Serialize;

/// The ordered turn log of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    /// Seeds a conversation with the caller's query.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::user(query)],
        }
    }

    /// Appends a turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the turn would violate the ordering rules.
    pub fn push(&mut self, turn: Turn) -> Result<(), Report<ConversationError>> {
        match turn.role {
            TurnRole::User => return Err(ConversationError::UnexpectedUserTurn.into()),
            TurnRole::Assistant => {
                if turn.tool_call_id.is_some() {
                    return Err(ConversationError::MalformedTurn {
                        role: turn.role,
                        reason: "assistant turns do not answer tool calls".to_string(),
                    }
                    .into());
                }
                let pending = self.pending_tool_calls().len();
                if pending > 0 {
                    return Err(ConversationError::PendingToolCalls { pending }.into());
                }
            }
            TurnRole::ToolResult => {
                if turn.has_tool_calls() {
                    return Err(ConversationError::MalformedTurn {
                        role: turn.role,
                        reason: "tool results cannot request tools".to_string(),
                    }
                    .into());
                }
                let expected = self.pending_tool_calls().first().map(|call| call.id.clone());
                if expected.is_none() || expected != turn.tool_call_id {
                    return Err(ConversationError::UnexpectedToolResult {
                        expected,
                        actual: turn.tool_call_id.clone(),
                    }
                    .into());
                }
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    /// Returns all turns in order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: a conversation holds at least its user turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the last turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Returns the most recent assistant turn and its position.
    fn last_assistant_indexed(&self) -> Option<(usize, &Turn)> {
        self.turns
            .iter()
            .enumerate()
            .rev()
            .find(|(_, turn)| turn.role == TurnRole::Assistant)
    }

    /// Returns the tool calls of the last assistant turn that have no result yet.
    #[must_use]
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        match self.last_assistant_indexed() {
            Some((index, turn)) => {
                let answered = self.turns.len() - index - 1;
                turn.tool_calls.get(answered..).unwrap_or_default()
            }
            None => &[],
        }
    }

    /// Returns the content of the last assistant turn, if it ended the run.
    #[must_use]
    pub fn final_answer(&self) -> Option<&str> {
        self.last()
            .filter(|turn| turn.role == TurnRole::Assistant && !turn.has_tool_calls())
            .map(|turn| turn.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "get_realtime_price", json!({"symbol": "AAPL"}))
    }

    #[test]
    fn starts_with_single_user_turn() {
        let state = ConversationState::new("How is AAPL doing?");
        assert_eq!(state.len(), 1);
        assert_eq!(state.turns()[0].role, TurnRole::User);
        assert_eq!(state.turns()[0].content, "How is AAPL doing?");
        assert!(state.final_answer().is_none());
    }

    #[test]
    fn rejects_second_user_turn() {
        let mut state = ConversationState::new("q");
        let err = state.push(Turn::user("again")).expect_err("should reject");
        assert_eq!(err.current_context(), &ConversationError::UnexpectedUserTurn);
    }

    #[test]
    fn tool_results_must_follow_request_order() {
        let mut state = ConversationState::new("q");
        state
            .push(Turn::assistant("", vec![call("a"), call("b")]))
            .expect("assistant turn");
        assert_eq!(state.pending_tool_calls().len(), 2);

        let err = state
            .push(Turn::tool_result(&call("b"), "out of order"))
            .expect_err("should reject");
        assert!(matches!(
            err.current_context(),
            ConversationError::UnexpectedToolResult { .. }
        ));

        state.push(Turn::tool_result(&call("a"), "first")).expect("a");
        assert_eq!(state.pending_tool_calls().len(), 1);
        assert_eq!(state.pending_tool_calls()[0].id, "b");
        state.push(Turn::tool_result(&call("b"), "second")).expect("b");
        assert!(state.pending_tool_calls().is_empty());
    }

    #[test]
    fn assistant_turn_waits_for_results() {
        let mut state = ConversationState::new("q");
        state
            .push(Turn::assistant("", vec![call("a")]))
            .expect("assistant turn");

        let err = state
            .push(Turn::assistant("done", vec![]))
            .expect_err("should reject");
        assert_eq!(
            err.current_context(),
            &ConversationError::PendingToolCalls { pending: 1 }
        );
    }

    #[test]
    fn tool_result_without_request_is_rejected() {
        let mut state = ConversationState::new("q");
        let err = state
            .push(Turn::tool_result(&call("a"), "orphan"))
            .expect_err("should reject");
        assert!(matches!(
            err.current_context(),
            ConversationError::UnexpectedToolResult { expected: None, .. }
        ));
    }

    #[test]
    fn final_answer_after_plain_assistant_turn() {
        let mut state = ConversationState::new("q");
        state
            .push(Turn::assistant("", vec![call("a")]))
            .expect("assistant turn");
        state.push(Turn::tool_result(&call("a"), "$1.00")).expect("result");
        state
            .push(Turn::assistant("It trades at $1.00.", vec![]))
            .expect("answer");

        assert_eq!(state.final_answer(), Some("It trades at $1.00."));
        assert_eq!(state.len(), 4);
    }
}
