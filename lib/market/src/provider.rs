//! Market-data provider abstraction.

use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::NaiveDate;
use rootcause::Report;
use serde::{Deserialize, Serialize};

/// The latest traded price of a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FastQuote {
    /// Last traded price, if the provider reported one.
    pub price: Option<f64>,
    /// ISO currency code, if the provider reported one.
    pub currency: Option<String>,
}

/// One day of open/high/low/close prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading day, in the exchange's local time.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest traded price.
    pub high: f64,
    /// Lowest traded price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

/// Source of quotes and daily bars.
///
/// Implementations receive symbols already passed through
/// [`normalize_symbol`].
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Returns the fast-path quote for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is unknown or the lookup fails.
    async fn fast_quote(&self, symbol: &str) -> Result<FastQuote, Report<ProviderError>>;

    /// Returns daily bars between `start` and `end`, inclusive, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is unknown or the lookup fails.
    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, Report<ProviderError>>;

    /// Returns the bars of the most recent trading day, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is unknown or the lookup fails.
    async fn recent_history(&self, symbol: &str) -> Result<Vec<DailyBar>, Report<ProviderError>>;
}

/// Trims and upper-cases a ticker symbol.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidSymbol`] if nothing is left after trimming.
pub fn normalize_symbol(symbol: &str) -> Result<String, ProviderError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ProviderError::InvalidSymbol {
            symbol: String::new(),
            reason: "symbol is empty".to_string(),
        });
    }
    Ok(symbol.to_uppercase())
}
