//! Yahoo Finance chart adapter for daily OHLCV history.
//!
//! # API
//! `GET {base}/v8/finance/chart/{ticker}?range={range}&interval=1d`
//!
//! The endpoint needs no authentication for basic access but is informally
//! rate limited; a proactive token bucket keeps the pipeline under that
//! budget. Rows with missing fields (halted sessions) are dropped before the
//! series reaches the screener.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use pulse_common::config::ProviderEndpointConfig;

use super::provider::ProviderError;
use super::rate_limiter::RateLimiter;
use super::OhlcvBar;

/// Chart endpoint path prefix
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// Daily interval parameter
const DAILY_INTERVAL: &str = "1d";

/// HTTP timeout for one chart request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
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
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============================================================================
// Adapter
// ============================================================================

/// HTTP client for the Yahoo Finance chart endpoint.
pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
    range: String,
    limiter: RateLimiter,
}

impl YahooChartClient {
    /// Create a new chart client.
    pub fn new(config: &ProviderEndpointConfig, range: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            range: range.to_string(),
            limiter: RateLimiter::new("chart", config.rate_limit_rpm),
        }
    }

    /// Fetch the daily OHLCV series for a ticker, chronologically ascending.
    pub async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, ProviderError> {
        if ticker.is_empty() {
            return Err(ProviderError::InvalidRequest("empty ticker".into()));
        }

        self.limiter.acquire().await;

        let url = format!("{}{}/{}", self.base_url, CHART_ENDPOINT, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", DAILY_INTERVAL)])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited(format!(
                    "chart provider throttled request for {}",
                    ticker
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::DataNotAvailable(format!(
                    "no chart data for {}",
                    ticker
                )));
            }
            status => {
                return Err(ProviderError::Network(format!(
                    "chart provider returned HTTP {} for {}",
                    status, ticker
                )));
            }
        }

        let parsed: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let bars = bars_from_response(parsed, ticker)?;
        debug!(ticker = %ticker, bars = bars.len(), "Fetched daily bars");
        Ok(bars)
    }
}

/// Convert a chart response into a clean ascending bar series.
///
/// Rows with any missing field are dropped; the remainder is sorted by
/// timestamp and de-duplicated so downstream consumers can rely on a strictly
/// ascending series.
fn bars_from_response(
    response: ChartResponse,
    ticker: &str,
) -> Result<Vec<OhlcvBar>, ProviderError> {
    if let Some(err) = response.chart.error {
        return Err(ProviderError::DataNotAvailable(format!(
            "{}: {} ({})",
            ticker, err.description, err.code
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| {
            ProviderError::DataNotAvailable(format!("empty chart result for {}", ticker))
        })?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut bars: Vec<OhlcvBar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp = to_utc(ts)?;
            Some(OhlcvBar {
                timestamp,
                open: *quote.open.get(i)?.as_ref()?,
                high: *quote.high.get(i)?.as_ref()?,
                low: *quote.low.get(i)?.as_ref()?,
                close: *quote.close.get(i)?.as_ref()?,
                volume: *quote.volume.get(i)?.as_ref()?,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);

    Ok(bars)
}

fn to_utc(epoch_secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(epoch_secs, 0).single()
}
