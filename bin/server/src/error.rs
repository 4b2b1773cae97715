//! Errors raised while building the agent.

use std::fmt;

/// Agent construction failures.
///
/// These never abort the process. Each request made before the agent is
/// built successfully reports the error in-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The model backend could not be configured.
    Model { reason: String },
    /// The market-data client could not be built.
    Market { reason: String },
    /// A tool could not be registered.
    Tools { reason: String },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model { reason } => write!(f, "agent initialization failed (model): {reason}"),
            Self::Market { reason } => {
                write!(f, "agent initialization failed (market data): {reason}")
            }
            Self::Tools { reason } => write!(f, "agent initialization failed (tools): {reason}"),
        }
    }
}

impl std::error::Error for InitError {}
