//! Market data module for the screening pipeline.
//!
//! Provides the core bar/message types, the provider abstraction, and the
//! HTTP adapters for the two upstream feeds the pipeline consumes:
//!
//! # Data Sources
//! - **Chart provider**: daily OHLCV bars (Yahoo Finance v8 chart endpoint)
//! - **Social provider**: trader message stream with optional explicit
//!   sentiment tags (StockTwits symbol stream)

mod provider;
mod rate_limiter;
mod stocktwits;
mod yahoo;

pub use provider::{LiveMarketData, MarketDataProvider, ProviderError};
pub use rate_limiter::RateLimiter;
pub use stocktwits::StocktwitsClient;
pub use yahoo::YahooChartClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// One OHLCV bar for a single trading interval.
///
/// A series of bars is always chronologically ascending with no duplicate
/// timestamps; the adapters enforce this before handing bars to the screener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Bar timestamp (interval open, UTC)
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Explicit stance a trader attached to a social message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplicitSentiment {
    Bullish,
    Bearish,
}

impl std::fmt::Display for ExplicitSentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
        }
    }
}

/// One message from the social feed.
///
/// Read-only input to the sentiment aggregator. Feeds are delivered
/// most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMessage {
    /// Provider-assigned message id
    pub id: u64,
    /// Message text
    pub body: String,
    /// Explicit stance, when the author tagged one
    pub explicit_sentiment: Option<ExplicitSentiment>,
    /// Author handle
    pub author: String,
    /// Author follower count at post time
    pub author_followers: u64,
    /// Post timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_sentiment_display() {
        assert_eq!(ExplicitSentiment::Bullish.to_string(), "Bullish");
        assert_eq!(ExplicitSentiment::Bearish.to_string(), "Bearish");
    }
}
