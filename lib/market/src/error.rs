//! Error types for market data lookups.

use std::fmt;

/// Errors from a market-data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The symbol is empty or unknown to the provider.
    InvalidSymbol { symbol: String, reason: String },
    /// The request could not be sent or timed out.
    RequestFailed { reason: String },
    /// The provider answered with an unexpected HTTP status.
    HttpStatus { status: u16, body: String },
    /// The response body could not be decoded.
    Decode { reason: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSymbol { symbol, reason } => {
                if symbol.is_empty() {
                    write!(f, "invalid symbol: {reason}")
                } else {
                    write!(f, "invalid symbol '{symbol}': {reason}")
                }
            }
            Self::RequestFailed { reason } => write!(f, "market data request failed: {reason}"),
            Self::HttpStatus { status, body } => {
                write!(f, "market data provider returned HTTP {status}: {body}")
            }
            Self::Decode { reason } => write!(f, "failed to decode market data: {reason}"),
        }
    }
}

impl std::error::Error for ProviderError {}
