//! LLM backends for ticker-agent.
//!
//! This crate provides:
//!
//! - **Backend trait**: one chat round-trip with tool definitions
//! - **Anthropic backend**: the Messages API over `reqwest`
//! - **Retry policy**: exponential backoff for transient failures
//! - **Scripted backend**: replays canned replies, for tests and local runs

pub mod anthropic;
pub mod backend;
pub mod error;
pub mod retry;
pub mod scripted;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use backend::{ChatRequest, ChatResponse, LlmBackend, TokenUsage};
pub use error::LlmError;
pub use retry::RetryPolicy;
pub use scripted::{RecordedRequest, ScriptedBackend};
