//! Data provider abstraction for the pipeline's upstream feeds.
//!
//! Defines the `MarketDataProvider` trait the screener and dispatcher consume,
//! so tests can substitute in-memory fakes for the HTTP adapters. Providers
//! are fail-fast: one attempt, no internal retry — a failed fetch surfaces as
//! a `ProviderError` and the affected ticker is handled locally by the caller.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use pulse_common::config::ProvidersConfig;

use super::stocktwits::StocktwitsClient;
use super::yahoo::YahooChartClient;
use super::{OhlcvBar, SocialMessage};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors surfaced by data providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Rate limit exceeded upstream
    RateLimited(String),
    /// No data available for the requested ticker
    DataNotAvailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Malformed or unexpected provider response
    Malformed(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is transient (a later batch run may succeed).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_))
    }
}

// ============================================================================
// Market Data Provider Trait
// ============================================================================

/// Upstream signal fetcher for one ticker: OHLCV history plus the raw
/// social-message feed.
///
/// Both methods are single-shot; callers decide how a failure is tolerated
/// (the screener skips the ticker, the dispatcher scores an empty feed).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the daily OHLCV series for a ticker, chronologically ascending.
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, ProviderError>;

    /// Fetch up to `limit` social messages for a ticker, most-recent-first.
    async fn social_messages(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<SocialMessage>, ProviderError>;
}

// ============================================================================
// Live Provider (HTTP adapters)
// ============================================================================

/// Production provider combining the chart and social HTTP adapters.
pub struct LiveMarketData {
    chart: YahooChartClient,
    social: StocktwitsClient,
}

impl LiveMarketData {
    /// Build the live provider from configuration.
    pub fn new(config: &ProvidersConfig) -> Self {
        Self {
            chart: YahooChartClient::new(&config.chart, &config.chart_range),
            social: StocktwitsClient::new(&config.social),
        }
    }
}

#[async_trait]
impl MarketDataProvider for LiveMarketData {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, ProviderError> {
        self.chart.daily_bars(ticker).await
    }

    async fn social_messages(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<SocialMessage>, ProviderError> {
        self.social.stream(ticker, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited("429".into()).is_recoverable());
        assert!(!ProviderError::DataNotAvailable("no bars".into()).is_recoverable());
        assert!(!ProviderError::Malformed("bad json".into()).is_recoverable());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited("retry later".into());
        assert!(err.to_string().contains("Rate limited"));

        let err = ProviderError::Network("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
