//! Stock lookup tools.
//!
//! Both tools answer in plain sentences. Provider failures are reported in
//! the text so the model can relay them; only malformed arguments surface as
//! a [`ToolError`].

use crate::error::ProviderError;
use crate::provider::{DailyBar, MarketDataProvider, normalize_symbol};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rootcause::Report;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use ticker_agent_conversation::{Tool, ToolError, ToolRegistry, ToolSpec, parse_arguments};

const DEFAULT_MONTHS_AGO: u32 = 3;
const DAYS_PER_MONTH: u64 = 30;
const DEFAULT_CURRENCY: &str = "USD";

/// Registers both stock tools against `provider`.
///
/// # Errors
///
/// Returns an error if either tool name is already taken.
pub fn register_tools(
    registry: &mut ToolRegistry,
    provider: Arc<dyn MarketDataProvider>,
) -> Result<(), Report<ToolError>> {
    registry.register(Arc::new(RealtimePriceTool::new(provider.clone())))?;
    registry.register(Arc::new(HistoricalPricesTool::new(provider)))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RealtimeArgs {
    symbol: String,
}

/// `get_realtime_price`: the latest traded price of a symbol.
pub struct RealtimePriceTool {
    spec: ToolSpec,
    provider: Arc<dyn MarketDataProvider>,
}

impl RealtimePriceTool {
    /// Tool name advertised to the model.
    pub const NAME: &'static str = "get_realtime_price";

    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        let spec = ToolSpec::new(
            Self::NAME,
            "Retrieves the real-time stock price for a given ticker symbol (e.g. 'AMZN' for Amazon).",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "The stock ticker symbol, e.g. 'AAPL'."
                }
            },
            "required": ["symbol"]
        }));
        Self { spec, provider }
    }

    async fn lookup(&self, symbol: &str) -> Result<Option<(f64, String)>, Report<ProviderError>> {
        let quote = self.provider.fast_quote(symbol).await?;
        let currency = quote
            .currency
            .filter(|currency| !currency.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        if let Some(price) = quote.price {
            return Ok(Some((price, currency)));
        }

        tracing::debug!(symbol, "no fast quote price, falling back to recent history");
        let bars = self.provider.recent_history(symbol).await?;
        Ok(bars.last().map(|bar| (bar.close, currency)))
    }
}

#[async_trait]
impl Tool for RealtimePriceTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, arguments: &JsonValue) -> Result<String, ToolError> {
        let args: RealtimeArgs = parse_arguments(Self::NAME, arguments)?;
        let symbol = match normalize_symbol(&args.symbol) {
            Ok(symbol) => symbol,
            Err(error) => {
                return Ok(format!(
                    "An error occurred while retrieving the price for {}: {error}",
                    args.symbol.trim()
                ));
            }
        };

        Ok(match self.lookup(&symbol).await {
            Ok(Some((price, currency))) => {
                format!("The real-time stock price for {symbol} is ${price:.2} {currency}.")
            }
            Ok(None) => format!(
                "Could not retrieve real-time price for {symbol}. The symbol may be invalid."
            ),
            Err(report) => {
                tracing::warn!(symbol = %symbol, error = %report.current_context(), "price lookup failed");
                format!(
                    "An error occurred while retrieving the price for {symbol}: {}",
                    report.current_context()
                )
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalArgs {
    symbol: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    months_ago: Option<u32>,
}

/// `get_historical_prices`: an open/close/high/low summary over a date range.
pub struct HistoricalPricesTool {
    spec: ToolSpec,
    provider: Arc<dyn MarketDataProvider>,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid {field} '{value}', expected YYYY-MM-DD ({e})"))
}

/// Summary figures over a run of daily bars.
fn summarize(bars: &[DailyBar]) -> Option<(f64, f64, f64, f64)> {
    let first = bars.first()?;
    let last = bars.last()?;
    let high = bars.iter().map(|bar| bar.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|bar| bar.low).fold(f64::MAX, f64::min);
    Some((first.open, last.close, high, low))
}

impl HistoricalPricesTool {
    /// Tool name advertised to the model.
    pub const NAME: &'static str = "get_historical_prices";

    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        let spec = ToolSpec::new(
            Self::NAME,
            "Retrieves historical daily stock prices for a ticker symbol and summarizes the \
             opening, closing, highest and lowest price over the range. Give explicit dates, or \
             months_ago for a trailing window (a quarter such as 'Q4 last year' is 3 months).",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "The stock ticker symbol, e.g. 'AAPL'."
                },
                "start_date": {
                    "type": "string",
                    "description": "First day of the range, YYYY-MM-DD."
                },
                "end_date": {
                    "type": "string",
                    "description": "Last day of the range, YYYY-MM-DD. Defaults to today."
                },
                "months_ago": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Length of a trailing window in months when start_date is omitted. Defaults to 3."
                }
            },
            "required": ["symbol"]
        }));
        Self {
            spec,
            provider,
            today: utc_today,
        }
    }

    /// Overrides the clock used to default `end_date`.
    #[must_use]
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn resolve_range(&self, args: &HistoricalArgs) -> Result<(NaiveDate, NaiveDate), String> {
        let end = match args.end_date.as_deref() {
            Some(value) => parse_date("end_date", value)?,
            None => (self.today)(),
        };
        let start = match args.start_date.as_deref() {
            Some(value) => parse_date("start_date", value)?,
            None => {
                let months = u64::from(args.months_ago.unwrap_or(DEFAULT_MONTHS_AGO));
                end.checked_sub_days(Days::new(months * DAYS_PER_MONTH))
                    .ok_or_else(|| format!("months_ago {months} is out of range"))?
            }
        };
        if start > end {
            return Err(format!("start date {start} is after end date {end}"));
        }
        Ok((start, end))
    }
}

#[async_trait]
impl Tool for HistoricalPricesTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, arguments: &JsonValue) -> Result<String, ToolError> {
        let args: HistoricalArgs = parse_arguments(Self::NAME, arguments)?;
        let error_text = |symbol: &str, reason: &dyn std::fmt::Display| {
            format!("An error occurred while retrieving historical data for {symbol}: {reason}")
        };

        let symbol = match normalize_symbol(&args.symbol) {
            Ok(symbol) => symbol,
            Err(error) => return Ok(error_text(args.symbol.trim(), &error)),
        };
        let (start, end) = match self.resolve_range(&args) {
            Ok(range) => range,
            Err(reason) => return Ok(error_text(&symbol, &reason)),
        };

        let bars = match self.provider.daily_history(&symbol, start, end).await {
            Ok(bars) => bars,
            Err(report) => {
                tracing::warn!(symbol = %symbol, error = %report.current_context(), "history lookup failed");
                return Ok(error_text(&symbol, report.current_context()));
            }
        };

        Ok(match summarize(&bars) {
            Some((open, close, high, low)) => format!(
                "Historical prices for {symbol} from {start} to {end}: opening price ${open:.2}, \
                 closing price ${close:.2}, highest price ${high:.2}, lowest price ${low:.2}."
            ),
            None => format!("No historical data found for {symbol} between {start} and {end}."),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FastQuote;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StaticProvider {
        quote: FastQuote,
        recent: Vec<DailyBar>,
        history: Vec<DailyBar>,
        failure: Option<ProviderError>,
        history_calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    }

    impl StaticProvider {
        fn check(&self) -> Result<(), Report<ProviderError>> {
            match &self.failure {
                Some(error) => Err(error.clone().into()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for StaticProvider {
        async fn fast_quote(&self, _symbol: &str) -> Result<FastQuote, Report<ProviderError>> {
            self.check()?;
            Ok(self.quote.clone())
        }

        async fn daily_history(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<DailyBar>, Report<ProviderError>> {
            self.history_calls
                .lock()
                .expect("lock")
                .push((symbol.to_string(), start, end));
            self.check()?;
            Ok(self.history.clone())
        }

        async fn recent_history(&self, _symbol: &str) -> Result<Vec<DailyBar>, Report<ProviderError>> {
            self.check()?;
            Ok(self.recent.clone())
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn bar(day: &str, open: f64, high: f64, low: f64, close: f64) -> DailyBar {
        DailyBar {
            date: date(day),
            open,
            high,
            low,
            close,
        }
    }

    fn realtime(provider: StaticProvider) -> RealtimePriceTool {
        RealtimePriceTool::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn realtime_price_sentence() {
        let tool = realtime(StaticProvider {
            quote: FastQuote {
                price: Some(123.45),
                currency: Some("USD".to_string()),
            },
            ..StaticProvider::default()
        });

        let text = tool.call(&json!({"symbol": "AAPL"})).await.expect("call");
        assert_eq!(text, "The real-time stock price for AAPL is $123.45 USD.");
    }

    #[tokio::test]
    async fn realtime_price_normalizes_symbol_and_defaults_currency() {
        let tool = realtime(StaticProvider {
            quote: FastQuote {
                price: Some(7.0),
                currency: None,
            },
            ..StaticProvider::default()
        });

        let text = tool.call(&json!({"symbol": " msft "})).await.expect("call");
        assert_eq!(text, "The real-time stock price for MSFT is $7.00 USD.");
    }

    #[tokio::test]
    async fn realtime_price_falls_back_to_recent_close() {
        let tool = realtime(StaticProvider {
            quote: FastQuote {
                price: None,
                currency: Some("EUR".to_string()),
            },
            recent: vec![bar("2024-05-02", 10.0, 12.0, 9.0, 11.5)],
            ..StaticProvider::default()
        });

        let text = tool.call(&json!({"symbol": "SAP"})).await.expect("call");
        assert_eq!(text, "The real-time stock price for SAP is $11.50 EUR.");
    }

    #[tokio::test]
    async fn realtime_price_without_any_price() {
        let tool = realtime(StaticProvider::default());
        let text = tool.call(&json!({"symbol": "NOPE"})).await.expect("call");
        assert_eq!(
            text,
            "Could not retrieve real-time price for NOPE. The symbol may be invalid."
        );
    }

    #[tokio::test]
    async fn realtime_price_reports_provider_error_as_text() {
        let tool = realtime(StaticProvider {
            failure: Some(ProviderError::RequestFailed {
                reason: "connection refused".to_string(),
            }),
            ..StaticProvider::default()
        });

        let text = tool.call(&json!({"symbol": "AAPL"})).await.expect("call");
        assert_eq!(
            text,
            "An error occurred while retrieving the price for AAPL: market data request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn realtime_price_rejects_missing_symbol() {
        let tool = realtime(StaticProvider::default());
        let err = tool.call(&json!({})).await.expect_err("missing symbol");
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn historical_summary() {
        let tool = HistoricalPricesTool::new(Arc::new(StaticProvider {
            history: vec![
                bar("2024-01-02", 100.0, 105.0, 95.0, 104.0),
                bar("2024-01-15", 104.0, 120.0, 101.0, 118.0),
                bar("2024-01-31", 117.0, 119.0, 108.0, 110.0),
            ],
            ..StaticProvider::default()
        }));

        let text = tool
            .call(&json!({"symbol": "AAPL", "start_date": "2024-01-01", "end_date": "2024-01-31"}))
            .await
            .expect("call");
        assert_eq!(
            text,
            "Historical prices for AAPL from 2024-01-01 to 2024-01-31: opening price $100.00, \
             closing price $110.00, highest price $120.00, lowest price $95.00."
        );
    }

    #[tokio::test]
    async fn historical_empty_range() {
        let tool = HistoricalPricesTool::new(Arc::new(StaticProvider::default()));
        let text = tool
            .call(&json!({"symbol": "AAPL", "start_date": "2024-01-06", "end_date": "2024-01-07"}))
            .await
            .expect("call");
        assert_eq!(
            text,
            "No historical data found for AAPL between 2024-01-06 and 2024-01-07."
        );
    }

    #[tokio::test]
    async fn historical_bad_dates_become_text() {
        let tool = HistoricalPricesTool::new(Arc::new(StaticProvider::default()));

        let text = tool
            .call(&json!({"symbol": "AAPL", "start_date": "last tuesday"}))
            .await
            .expect("call");
        assert!(text.starts_with("An error occurred while retrieving historical data for AAPL: invalid start_date"));

        let text = tool
            .call(&json!({"symbol": "AAPL", "start_date": "2024-02-01", "end_date": "2024-01-01"}))
            .await
            .expect("call");
        assert_eq!(
            text,
            "An error occurred while retrieving historical data for AAPL: start date 2024-02-01 is after end date 2024-01-01"
        );
    }

    #[tokio::test]
    async fn historical_defaults_to_trailing_months() {
        let provider = Arc::new(StaticProvider::default());
        let tool = HistoricalPricesTool::new(provider.clone()).with_today(|| date("2024-06-30"));

        tool.call(&json!({"symbol": "aapl"})).await.expect("default window");
        tool.call(&json!({"symbol": "AAPL", "months_ago": 1, "end_date": "2024-03-31"}))
            .await
            .expect("one month");

        let calls = provider.history_calls.lock().expect("lock").clone();
        assert_eq!(
            calls,
            vec![
                ("AAPL".to_string(), date("2024-04-01"), date("2024-06-30")),
                ("AAPL".to_string(), date("2024-03-01"), date("2024-03-31")),
            ]
        );
    }

    #[tokio::test]
    async fn historical_reports_provider_error_as_text() {
        let tool = HistoricalPricesTool::new(Arc::new(StaticProvider {
            failure: Some(ProviderError::InvalidSymbol {
                symbol: "ZZZZ".to_string(),
                reason: "No data found".to_string(),
            }),
            ..StaticProvider::default()
        }));

        let text = tool
            .call(&json!({"symbol": "ZZZZ", "start_date": "2024-01-01", "end_date": "2024-01-31"}))
            .await
            .expect("call");
        assert_eq!(
            text,
            "An error occurred while retrieving historical data for ZZZZ: invalid symbol 'ZZZZ': No data found"
        );
    }

    #[test]
    fn register_tools_in_order() {
        let mut registry = ToolRegistry::new();
        register_tools(&mut registry, Arc::new(StaticProvider::default())).expect("register");
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["get_realtime_price", "get_historical_prices"]);
    }
}
