//! A backend that replays scripted replies.
//!
//! Each call to [`LlmBackend::chat`] pops the next reply off the script and
//! records what the caller sent, so loop behavior can be checked without a
//! network.

use crate::backend::{ChatRequest, ChatResponse, LlmBackend, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::Report;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use ticker_agent_conversation::{ToolCallRequest, Turn};

/// What a scripted backend observed on one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The system preamble.
    pub system: Option<String>,
    /// The conversation as sent.
    pub turns: Vec<Turn>,
    /// Names of the advertised tools.
    pub tool_names: Vec<String>,
}

/// Replays queued replies in order.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Turn, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a final answer.
    #[must_use]
    pub fn then_answer(self, content: impl Into<String>) -> Self {
        self.then_turn(Turn::assistant(content, Vec::new()))
    }

    /// Queues a reply that requests tool calls.
    #[must_use]
    pub fn then_tools(self, content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        self.then_turn(Turn::assistant(content, calls))
    }

    /// Queues an arbitrary assistant turn.
    #[must_use]
    pub fn then_turn(self, turn: Turn) -> Self {
        lock(&self.replies).push_back(Ok(turn));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn then_fail(self, error: LlmError) -> Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// Returns every request seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the number of replies still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, Report<LlmError>> {
        lock(&self.requests).push(RecordedRequest {
            system: request.system.map(str::to_string),
            turns: request.turns.to_vec(),
            tool_names: request.tools.iter().map(|tool| tool.name.clone()).collect(),
        });

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidRequest {
                    status: 0,
                    reason: "script exhausted".to_string(),
                })
            })?;

        Ok(ChatResponse {
            turn: reply,
            usage: TokenUsage::default(),
            model: "scripted".to_string(),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
