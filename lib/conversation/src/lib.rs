//! Conversation model for ticker-agent.
//!
//! This crate provides:
//!
//! - **Turns**: user, assistant and tool-result entries of a conversation
//! - **Conversation state**: the append-only turn log of a single run
//! - **Tool registry**: tools advertised to the model and their handlers

pub mod error;
pub mod state;
pub mod tool;
pub mod turn;

pub use error::{ConversationError, ToolError};
pub use state::ConversationState;
pub use tool::{Tool, ToolRegistry, ToolSpec, parse_arguments};
pub use turn::{ToolCallRequest, Turn, TurnRole};
