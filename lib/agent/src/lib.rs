//! The tool-calling control loop.
//!
//! An [`Agent`] alternates between asking the model for its next turn and
//! executing the tool calls that turn requests, until the model answers
//! without calling tools or the iteration cap is hit.

pub mod agent;
pub mod config;
pub mod error;
pub mod state;

pub use agent::{Agent, AgentRun, AgentStep, AgentStream};
pub use config::{AgentConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::AgentError;
pub use state::{LoopState, should_continue};
