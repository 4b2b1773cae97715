//! Agent configuration.

/// Preamble sent with every model call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a financial assistant that answers questions \
about stock prices. Use the available tools to look up real-time and historical prices. When a \
tool returns a fact, state it exactly as the tool phrased it, including the numbers, currency \
and dates, instead of paraphrasing or rounding it. If a tool reports an error, tell the user \
what went wrong.";

/// Knobs for one [`Agent`](crate::Agent).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// System preamble for the model.
    pub system_prompt: String,
    /// Maximum number of model calls per run.
    pub max_iterations: u32,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens per model reply.
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 10,
            temperature: Some(0.0),
            max_tokens: 1024,
        }
    }
}

impl AgentConfig {
    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }
}
