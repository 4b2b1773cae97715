//! Market data for ticker-agent.
//!
//! This crate provides:
//!
//! - **Provider trait**: quotes and daily bars for a ticker symbol
//! - **Yahoo client**: the production provider, backed by the chart API
//! - **Stock tools**: `get_realtime_price` and `get_historical_prices`

pub mod error;
pub mod provider;
pub mod tools;
pub mod yahoo;

pub use error::ProviderError;
pub use provider::{DailyBar, FastQuote, MarketDataProvider, normalize_symbol};
pub use tools::{HistoricalPricesTool, RealtimePriceTool, register_tools};
pub use yahoo::{YahooConfig, YahooFinance};
