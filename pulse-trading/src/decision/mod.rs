//! Decision engine collaborator interface.
//!
//! The engine is an opaque multi-step reasoning service: given a ticker and
//! account parameters it returns a natural-language trading report. Whatever
//! internal structure it has stays behind the single `DecisionEngine`
//! call/response seam so the dispatcher, and tests, never depend on it.

mod bridge;

pub use bridge::EngineBridge;

use async_trait::async_trait;

use crate::sentiment::SentimentSummary;

/// One analysis request for one ticker.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub ticker: String,
    /// Account size in USD
    pub account_size: f64,
    /// Analysis window (1mo, 3mo, 6mo, 1y)
    pub analysis_period: String,
    /// Current portfolio holdings, or "None"
    pub current_portfolio: String,
    /// Aggregated social sentiment handed to the engine as context
    pub sentiment: Option<SentimentSummary>,
}

/// Opaque decision engine: one call, one text report.
///
/// Implementations are single-shot; a failure is job data for the
/// dispatcher, not something to retry here.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Produce the trading report for one ticker.
    async fn analyze(&self, request: &DecisionRequest) -> anyhow::Result<String>;
}
