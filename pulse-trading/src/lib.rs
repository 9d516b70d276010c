//! Pulse Trading Library
//!
//! Screens a universe of equity tickers for technical eligibility, aggregates
//! social sentiment for each surviving ticker, dispatches a bounded number of
//! concurrent decision jobs against the downstream decision engine, and
//! persists structured outcomes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     pulse-trading (pipeline)                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  tickers ──▶ Screener ──▶ candidates ──▶ Dispatcher (≤ N jobs)   │
//! │                                              │                   │
//! │                            Sentiment ◀───────┤───▶ Decision      │
//! │                            Aggregator        │     Engine        │
//! │                                              ▼                   │
//! │                                         Result Store             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Behaviors
//!
//! - The screener is pure and never fails the batch; per-ticker problems
//!   exclude that ticker only, and an empty candidate list falls back to a
//!   fixed pair of liquid names.
//! - The dispatcher's semaphore is the single admission gate; job failures
//!   are recorded per ticker and never abort siblings.
//! - The pipeline always produces one outcome per dispatched ticker, with
//!   error detail embedded in the outcome rather than thrown.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod decision;
pub mod dispatch;
pub mod screener;
pub mod sentiment;
pub mod store;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use pulse_common::config::Config;

use crate::data::{LiveMarketData, MarketDataProvider, OhlcvBar};
use crate::decision::{DecisionEngine, EngineBridge};
use crate::dispatch::{Dispatcher, JobOutcome, JobStatus};
use crate::screener::{ScreenOutcome, ScreenReport, Screener, ScreenerConfig};
use crate::sentiment::SentimentAggregator;
use crate::store::ResultStore;

// ============================================================================
// Pipeline Context
// ============================================================================

/// Explicitly constructed collaborators for one pipeline run.
///
/// Passed down instead of living in process-wide globals, so concurrent jobs
/// stay isolated and tests can swap any collaborator for a fake.
pub struct PipelineContext {
    /// Configuration
    pub config: Config,
    /// Upstream signal fetcher (bars + social messages)
    pub provider: Arc<dyn MarketDataProvider>,
    /// Opaque decision engine
    pub engine: Arc<dyn DecisionEngine>,
    /// Shared, stateless sentiment aggregator
    pub aggregator: Arc<SentimentAggregator>,
    /// Durable result store
    pub store: Arc<ResultStore>,
}

impl PipelineContext {
    /// Build the production context from configuration.
    ///
    /// Opening and initializing the result store is the only unrecoverable
    /// startup failure; everything later degrades per ticker.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(ResultStore::open(&config.pipeline.database_path())?);
        store.init().await?;

        Ok(Self {
            provider: Arc::new(LiveMarketData::new(&config.providers)),
            engine: Arc::new(EngineBridge::new(&config.engine)),
            aggregator: Arc::new(SentimentAggregator::with_defaults()),
            store,
            config,
        })
    }

    /// Build a context from explicit collaborators (tests, embedding).
    pub fn with_collaborators(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        engine: Arc<dyn DecisionEngine>,
        aggregator: Arc<SentimentAggregator>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            config,
            provider,
            engine,
            aggregator,
            store,
        }
    }
}

// ============================================================================
// Pipeline Service
// ============================================================================

/// Result of one batch run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Screening diagnostics and candidate list
    pub screen: ScreenOutcome,
    /// One outcome per dispatched ticker, submission order
    pub outcomes: Vec<JobOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl PipelineReport {
    /// Human-readable batch summary for the CLI surface.
    pub fn summary_text(&self) -> String {
        let mut out = ScreenReport::new(&self.screen).to_text();

        out.push('\n');
        out.push_str(&"=".repeat(50));
        out.push_str("\nBATCH EXECUTION COMPLETE\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');

        for outcome in &self.outcomes {
            match outcome.status {
                JobStatus::Succeeded => {
                    out.push_str(&format!("{:<8} finished\n", outcome.ticker));
                }
                _ => {
                    out.push_str(&format!(
                        "{:<8} failed: {}\n",
                        outcome.ticker,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }

        out.push_str(&format!(
            "{} succeeded, {} failed\n",
            self.succeeded, self.failed
        ));
        out
    }
}

/// The batch pipeline: screen, dispatch, summarize.
pub struct PipelineService {
    ctx: PipelineContext,
}

impl PipelineService {
    /// Create a service over a prepared context.
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Run one full batch.
    ///
    /// Infallible by contract: fetch and job failures are folded into the
    /// report, never raised.
    pub async fn run_batch(&self) -> PipelineReport {
        let config = &self.ctx.config.pipeline;

        info!(tickers = config.tickers.len(), "Screening ticker universe");
        let batch = self.fetch_series(&config.tickers).await;

        let screener = Screener::new(ScreenerConfig {
            fallback_tickers: config.fallback_tickers.clone(),
            ..ScreenerConfig::default()
        });
        let screen = screener.screen(&batch);

        info!(
            screened = screen.results.len(),
            candidates = screen.candidates.len(),
            fallback = screen.fallback_used,
            "Screening complete"
        );

        let dispatcher = Dispatcher::new(
            config,
            Arc::clone(&self.ctx.provider),
            Arc::clone(&self.ctx.engine),
            Arc::clone(&self.ctx.aggregator),
            Arc::clone(&self.ctx.store),
        );
        let outcomes = dispatcher.run(&screen.candidates).await;

        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Succeeded)
            .count();
        let failed = outcomes.len() - succeeded;

        info!(succeeded, failed, "Batch complete");

        PipelineReport {
            screen,
            outcomes,
            succeeded,
            failed,
        }
    }

    /// Fetch daily bars for the universe, excluding tickers whose fetch
    /// fails. A data-fetch error never surfaces as a pipeline failure.
    async fn fetch_series(&self, tickers: &[String]) -> Vec<(String, Vec<OhlcvBar>)> {
        let mut batch = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            match self.ctx.provider.daily_bars(ticker).await {
                Ok(bars) => batch.push((ticker.clone(), bars)),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Bar fetch failed, excluding ticker");
                }
            }
        }

        batch
    }
}
