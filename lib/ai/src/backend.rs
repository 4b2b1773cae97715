//! LLM backend abstraction.
//!
//! A backend performs one chat round-trip: it receives the whole conversation
//! plus the advertised tools and returns the model's next assistant turn.

use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use ticker_agent_conversation::{ToolSpec, Turn};

/// A request for the model's next turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// System preamble, if any.
    pub system: Option<&'a str>,
    /// The conversation so far, oldest first.
    pub turns: &'a [Turn],
    /// Tools the model may call.
    pub tools: &'a [ToolSpec],
    /// Temperature for sampling (0.0 - 1.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl<'a> ChatRequest<'a> {
    /// Creates a request over the given turns with no tools.
    #[must_use]
    pub fn new(turns: &'a [Turn]) -> Self {
        Self {
            system: None,
            turns,
            tools: &[],
            temperature: None,
            max_tokens: 1024,
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: &'a str) -> Self {
        self.system = Some(system);
        self
    }

    /// Sets the advertised tools.
    #[must_use]
    pub fn with_tools(mut self, tools: &'a [ToolSpec]) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// The model's reply.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant turn, with any tool calls the model requested.
    pub turn: Turn,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Trait for LLM backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Asks the model for its next turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails after the backend's own retries.
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, Report<LlmError>>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
