//! Yahoo Finance chart API client.
//!
//! Quotes and daily bars both come from
//! `GET {base_url}/v8/finance/chart/{symbol}`. The chart's `meta` block
//! carries the latest price and currency; the `indicators.quote` series
//! carry the bars, aligned with `timestamp`.

use crate::error::ProviderError;
use crate::provider::{DailyBar, FastQuote, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use rootcause::Report;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// Configuration for [`YahooFinance`].
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// API base URL.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header; the API rejects requests without one.
    pub user_agent: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("ticker-agent/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Market-data provider backed by the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooFinance {
    client: reqwest::Client,
    config: YahooConfig,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResult {
    /// Zips the series into bars, dropping days with missing values.
    fn bars(&self) -> Vec<DailyBar> {
        let Some(series) = self.indicators.quote.first() else {
            return Vec::new();
        };

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let local = ts.checked_add(self.meta.gmtoffset)?;
                let date = DateTime::from_timestamp(local, 0)?.date_naive();
                Some(DailyBar {
                    date,
                    open: series.open.get(i).copied().flatten()?,
                    high: series.high.get(i).copied().flatten()?,
                    low: series.low.get(i).copied().flatten()?,
                    close: series.close.get(i).copied().flatten()?,
                })
            })
            .collect()
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl YahooFinance {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: YahooConfig) -> Result<Self, Report<ProviderError>> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url, ProviderError> {
        let invalid_base = |reason: String| ProviderError::RequestFailed {
            reason: format!("invalid base URL '{}': {reason}", self.config.base_url),
        };
        let mut url =
            reqwest::Url::parse(&self.config.base_url).map_err(|e| invalid_base(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid_base("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        query: &[(&str, String)],
    ) -> Result<ChartResult, Report<ProviderError>> {
        let url = self.chart_url(symbol)?;

        let response = self.client.get(url).query(query).send().await.map_err(|e| {
            tracing::warn!(error = %e, symbol, "market data request failed");
            ProviderError::RequestFailed {
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ProviderError::RequestFailed {
            reason: e.to_string(),
        })?;

        if status == reqwest::StatusCode::NOT_FOUND {
            let reason = serde_json::from_str::<ChartEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.chart.error)
                .map_or_else(|| "symbol not found".to_string(), |error| error.description);
            return Err(ProviderError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason,
            }
            .into());
        }
        if !status.is_success() {
            tracing::warn!(symbol, status = %status, "market data provider returned error");
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let envelope: ChartEnvelope = serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
            reason: e.to_string(),
        })?;

        match (envelope.chart.result.and_then(|r| r.into_iter().next()), envelope.chart.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(ProviderError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason: format!("{}: {}", error.code, error.description),
            }
            .into()),
            (None, None) => Err(ProviderError::Decode {
                reason: "chart response has no result".to_string(),
            }
            .into()),
        }
    }
}

fn one_day_query() -> [(&'static str, String); 2] {
    [("range", "1d".to_string()), ("interval", "1d".to_string())]
}

#[async_trait]
impl MarketDataProvider for YahooFinance {
    #[instrument(skip(self))]
    async fn fast_quote(&self, symbol: &str) -> Result<FastQuote, Report<ProviderError>> {
        let chart = self.fetch_chart(symbol, &one_day_query()).await?;
        Ok(FastQuote {
            price: chart.meta.regular_market_price,
            currency: chart.meta.currency,
        })
    }

    #[instrument(skip(self))]
    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, Report<ProviderError>> {
        let period_end = end.succ_opt().unwrap_or(end);
        let query = [
            ("period1", unix_midnight(start).to_string()),
            ("period2", unix_midnight(period_end).to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.fetch_chart(symbol, &query).await?;
        let bars: Vec<DailyBar> = chart
            .bars()
            .into_iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .collect();
        tracing::debug!(bars = bars.len(), "fetched daily history");
        Ok(bars)
    }

    #[instrument(skip(self))]
    async fn recent_history(&self, symbol: &str) -> Result<Vec<DailyBar>, Report<ProviderError>> {
        let chart = self.fetch_chart(symbol, &one_day_query()).await?;
        Ok(chart.bars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> YahooFinance {
        YahooFinance::new(YahooConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            user_agent: "ticker-agent-test".to_string(),
        })
        .expect("client")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    // 2024-01-02 and 2024-01-03, 14:30 UTC
    fn chart_body() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "symbol": "AAPL", "regularMarketPrice": 123.45, "gmtoffset": -18000},
                    "timestamp": [1704205800, 1704292200],
                    "indicators": {"quote": [{
                        "open": [100.0, 104.0],
                        "high": [120.0, 108.0],
                        "low": [95.0, 101.0],
                        "close": [105.0, 110.0],
                        "volume": [1000, 2000]
                    }]}
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn fast_quote_reads_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let quote = client(&server).fast_quote("AAPL").await.expect("quote");
        assert_eq!(quote.price, Some(123.45));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn daily_history_zips_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("interval", "1d"))
            .and(query_param("period1", unix_midnight(date("2024-01-01")).to_string()))
            .and(query_param("period2", unix_midnight(date("2024-02-01")).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let bars = client(&server)
            .daily_history("AAPL", date("2024-01-01"), date("2024-01-31"))
            .await
            .expect("history");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date("2024-01-02"));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[1].close, 110.0);
    }

    #[tokio::test]
    async fn null_values_drop_the_day() {
        let server = MockServer::start().await;
        let mut body = chart_body();
        body["chart"]["result"][0]["indicators"]["quote"][0]["close"] = json!([null, 110.0]);
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let bars = client(&server).recent_history("AAPL").await.expect("history");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 110.0);
    }

    #[tokio::test]
    async fn out_of_range_timestamp_drops_the_day() {
        let server = MockServer::start().await;
        let mut body = chart_body();
        body["chart"]["result"][0]["meta"]["gmtoffset"] = json!(18000);
        body["chart"]["result"][0]["timestamp"] = json!([i64::MAX, 1704292200]);
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let bars = client(&server).recent_history("AAPL").await.expect("history");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date("2024-01-03"));
        assert_eq!(bars[0].close, 110.0);
    }

    #[tokio::test]
    async fn not_found_is_invalid_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ZZZZ"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server).fast_quote("ZZZZ").await.expect_err("404");
        assert_eq!(
            err.current_context(),
            &ProviderError::InvalidSymbol {
                symbol: "ZZZZ".to_string(),
                reason: "No data found, symbol may be delisted".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server).fast_quote("AAPL").await.expect_err("503");
        assert_eq!(
            err.current_context(),
            &ProviderError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).fast_quote("AAPL").await.expect_err("decode");
        assert!(matches!(err.current_context(), ProviderError::Decode { .. }));
    }

    #[test]
    fn chart_url_tolerates_trailing_slash() {
        let yahoo = YahooFinance::new(YahooConfig {
            base_url: "https://example.test/".to_string(),
            ..YahooConfig::default()
        })
        .expect("client");
        let url = yahoo.chart_url("BRK-B").expect("url");
        assert_eq!(url.as_str(), "https://example.test/v8/finance/chart/BRK-B");
    }
}
