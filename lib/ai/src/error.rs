//! Error types for the AI crate.

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The backend could not be configured.
    InvalidConfig { reason: String },
    /// The provider rejected the credentials.
    Authentication { reason: String },
    /// The provider rejected the request as malformed.
    InvalidRequest { status: u16, reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The provider failed with a 5xx status.
    ServerError { status: u16, reason: String },
    /// The request could not be sent or the connection failed.
    RequestFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
}

impl LlmError {
    /// Returns true if a later attempt of the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::RequestFailed { .. }
                | Self::Timeout
        )
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
            Self::Authentication { reason } => {
                write!(f, "LLM authentication failed: {reason}")
            }
            Self::InvalidRequest { status, reason } => {
                write!(f, "LLM request rejected ({status}): {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ServerError { status, reason } => {
                write!(f, "LLM provider error ({status}): {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
