//! End-to-end integration tests for the batch pipeline.
//!
//! Exercises the complete flow with in-memory collaborators:
//! Universe → Screener → Dispatcher → Sentiment + Decision engine → Store
//!
//! No network access; providers and the engine are substituted with fakes.

use anyhow::bail;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use pulse_common::config::Config;
use pulse_trading::data::{
    ExplicitSentiment, MarketDataProvider, OhlcvBar, ProviderError, SocialMessage,
};
use pulse_trading::decision::{DecisionEngine, DecisionRequest};
use pulse_trading::dispatch::JobStatus;
use pulse_trading::sentiment::SentimentAggregator;
use pulse_trading::store::{ResultStore, TradeDecision};
use pulse_trading::{PipelineContext, PipelineService};

// ============================================================================
// Test Data Generators
// ============================================================================

/// Flat daily series long enough for every screening window.
fn passing_bars(close: f64) -> Vec<OhlcvBar> {
    flat_bars(200, close, 900_000.0)
}

fn flat_bars(count: usize, close: f64, volume: f64) -> Vec<OhlcvBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| OhlcvBar {
            timestamp: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}

fn bullish_feed(count: usize) -> Vec<SocialMessage> {
    let newest = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| SocialMessage {
            id: i as u64,
            body: "loading up before the breakout".into(),
            explicit_sentiment: Some(ExplicitSentiment::Bullish),
            author: format!("trader{}", i),
            author_followers: 100 * (i as u64 + 1),
            created_at: newest - Duration::minutes(i as i64),
        })
        .collect()
}

// ============================================================================
// Fakes
// ============================================================================

/// In-memory provider: canned bars and feeds per ticker, optional fetch
/// failures.
struct FakeProvider {
    bars: HashMap<String, Vec<OhlcvBar>>,
    feeds: HashMap<String, Vec<SocialMessage>>,
    broken_bars: Vec<String>,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            bars: HashMap::new(),
            feeds: HashMap::new(),
            broken_bars: Vec::new(),
        }
    }

    fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }

    fn with_feed(mut self, ticker: &str, feed: Vec<SocialMessage>) -> Self {
        self.feeds.insert(ticker.to_string(), feed);
        self
    }

    fn with_broken_bars(mut self, ticker: &str) -> Self {
        self.broken_bars.push(ticker.to_string());
        self
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, ProviderError> {
        if self.broken_bars.iter().any(|t| t == ticker) {
            return Err(ProviderError::Network("simulated outage".into()));
        }
        Ok(self.bars.get(ticker).cloned().unwrap_or_default())
    }

    async fn social_messages(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<SocialMessage>, ProviderError> {
        let mut feed = self.feeds.get(ticker).cloned().unwrap_or_default();
        feed.truncate(limit);
        Ok(feed)
    }
}

/// Scripted engine: a report per ticker, with optional failures.
struct FakeEngine {
    reports: HashMap<String, String>,
    failing: Vec<String>,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            reports: HashMap::new(),
            failing: Vec::new(),
        }
    }

    fn with_report(mut self, ticker: &str, report: &str) -> Self {
        self.reports.insert(ticker.to_string(), report.to_string());
        self
    }

    fn with_failure(mut self, ticker: &str) -> Self {
        self.failing.push(ticker.to_string());
        self
    }
}

#[async_trait]
impl DecisionEngine for FakeEngine {
    async fn analyze(&self, request: &DecisionRequest) -> anyhow::Result<String> {
        if self.failing.iter().any(|t| t == &request.ticker) {
            bail!("simulated engine failure for {}", request.ticker);
        }
        Ok(self
            .reports
            .get(&request.ticker)
            .cloned()
            .unwrap_or_else(|| format!("Generic analysis for {}", request.ticker)))
    }
}

// ============================================================================
// Harness
// ============================================================================

fn test_config(tickers: &[&str], batch_size: usize) -> Config {
    let mut config = Config::default();
    config.pipeline.tickers = tickers.iter().map(|s| s.to_string()).collect();
    config.pipeline.batch_size = batch_size;
    config.pipeline.decision_timeout_secs = 30;
    config
}

async fn service(
    config: Config,
    provider: FakeProvider,
    engine: FakeEngine,
) -> (PipelineService, Arc<ResultStore>) {
    let store = Arc::new(ResultStore::in_memory().unwrap());
    store.init().await.unwrap();

    let ctx = PipelineContext::with_collaborators(
        config,
        Arc::new(provider),
        Arc::new(engine),
        Arc::new(SentimentAggregator::with_defaults()),
        Arc::clone(&store),
    );
    (PipelineService::new(ctx), store)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_pipeline_screens_dispatches_and_persists() {
    let provider = FakeProvider::new()
        .with_bars("AAPL", passing_bars(180.0))
        .with_bars("NVDA", passing_bars(120.0))
        .with_bars("PENNY", passing_bars(4.0))
        .with_feed("AAPL", bullish_feed(12))
        .with_feed("NVDA", bullish_feed(5));

    let engine = FakeEngine::new()
        .with_report("AAPL", "Strong setup.\nDECISION: BUY\nSize: quarter position")
        .with_report("NVDA", "Extended move.\nDECISION: SELL\nTake profits");

    let config = test_config(&["AAPL", "NVDA", "PENNY"], 2);
    let (service, store) = service(config, provider, engine).await;

    let report = service.run_batch().await;

    // PENNY shows in diagnostics as rejected; two candidates dispatched
    assert_eq!(report.screen.results.len(), 3);
    assert!(!report.screen.fallback_used);
    assert_eq!(report.screen.candidates, vec!["AAPL", "NVDA"]);

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);
    assert!(report.outcomes[0].report.as_ref().unwrap().contains("DECISION: BUY"));

    // Both analyses persisted with extracted decisions
    assert_eq!(store.count().await.unwrap(), 2);
    let records = store.recent(10).await.unwrap();
    let by_ticker: HashMap<_, _> = records
        .iter()
        .map(|r| (r.ticker.as_str(), r.decision))
        .collect();
    assert_eq!(by_ticker["AAPL"], TradeDecision::Buy);
    assert_eq!(by_ticker["NVDA"], TradeDecision::Sell);
}

#[tokio::test]
async fn test_fetch_failure_excludes_ticker_without_aborting() {
    let provider = FakeProvider::new()
        .with_bars("AAPL", passing_bars(180.0))
        .with_broken_bars("DEAD");

    let engine = FakeEngine::new().with_report("AAPL", "DECISION: BUY");

    let config = test_config(&["AAPL", "DEAD"], 1);
    let (service, store) = service(config, provider, engine).await;

    let report = service.run_batch().await;

    // DEAD never reaches the diagnostic table
    assert_eq!(report.screen.results.len(), 1);
    assert_eq!(report.screen.candidates, vec!["AAPL"]);
    assert_eq!(report.succeeded, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_rejected_universe_falls_back_to_fixed_set() {
    let provider = FakeProvider::new()
        .with_bars("JUNK1", flat_bars(200, 4.0, 100_000.0))
        .with_bars("JUNK2", flat_bars(200, 2.0, 50_000.0));

    // The fallback tickers get generic reports; no bars needed for dispatch
    let engine = FakeEngine::new();

    let config = test_config(&["JUNK1", "JUNK2"], 2);
    let (service, store) = service(config, provider, engine).await;

    let report = service.run_batch().await;

    assert!(report.screen.fallback_used);
    assert_eq!(report.screen.candidates, vec!["AAPL", "MSFT"]);
    // The fallback set is dispatched, not dropped
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.succeeded, 2);
    // Markerless generic reports resolve to HOLD
    let records = store.recent(10).await.unwrap();
    assert!(records.iter().all(|r| r.decision == TradeDecision::Hold));
}

#[tokio::test]
async fn test_engine_failure_is_isolated_to_its_job() {
    let provider = FakeProvider::new()
        .with_bars("AAPL", passing_bars(180.0))
        .with_bars("NVDA", passing_bars(120.0))
        .with_bars("TSLA", passing_bars(250.0));

    let engine = FakeEngine::new()
        .with_report("AAPL", "DECISION: BUY")
        .with_failure("NVDA")
        .with_report("TSLA", "DECISION: SELL");

    let config = test_config(&["AAPL", "NVDA", "TSLA"], 2);
    let (service, store) = service(config, provider, engine).await;

    let report = service.run_batch().await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    let failed = report
        .outcomes
        .iter()
        .find(|o| o.status == JobStatus::Failed)
        .unwrap();
    assert_eq!(failed.ticker, "NVDA");
    assert!(failed.error.as_ref().unwrap().contains("simulated engine failure"));

    // The two healthy jobs were persisted; the failed one was not
    assert_eq!(store.count().await.unwrap(), 2);
    assert!(store
        .recent(10)
        .await
        .unwrap()
        .iter()
        .all(|r| r.ticker != "NVDA"));
}

#[tokio::test]
async fn test_summary_text_covers_table_and_outcomes() {
    let provider = FakeProvider::new()
        .with_bars("AAPL", passing_bars(180.0))
        .with_bars("PENNY", passing_bars(4.0));

    let engine = FakeEngine::new().with_report("AAPL", "DECISION: BUY");

    let config = test_config(&["AAPL", "PENNY"], 1);
    let (service, _store) = service(config, provider, engine).await;

    let report = service.run_batch().await;
    let text = report.summary_text();

    assert!(text.contains("TICKER"));
    assert!(text.contains("PASSED"));
    assert!(text.contains("REJECTED"));
    assert!(text.contains("BATCH EXECUTION COMPLETE"));
    assert!(text.contains("1 succeeded, 0 failed"));
}
