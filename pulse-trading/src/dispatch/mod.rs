//! Bounded-concurrency dispatch of decision jobs.
//!
//! One job per candidate ticker, at most N jobs running at once, one outcome
//! per input ticker in submission order. The admission gate is a counting
//! semaphore: a job may not enter `Running` without holding a permit, and the
//! permit is released on every exit path, failure included. The limit exists
//! to respect the rate limits of the decision engine's upstream providers;
//! raising it is a correctness hazard, not a tuning knob.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use pulse_common::config::PipelineConfig;

use crate::data::MarketDataProvider;
use crate::decision::{DecisionEngine, DecisionRequest};
use crate::sentiment::SentimentAggregator;
use crate::store::ResultStore;

// ============================================================================
// Job State
// ============================================================================

/// Lifecycle of one decision job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, waiting for an admission slot
    Pending,
    /// Holding a slot, analysis in flight
    Running,
    /// Engine returned a report
    Succeeded,
    /// Engine call failed or timed out
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of bounded-concurrency work for one ticker.
///
/// Owned and mutated only by the worker that runs it; transitions
/// Pending → Running → Succeeded | Failed exactly once.
#[derive(Debug, Clone)]
pub struct DecisionJob {
    pub id: Uuid,
    pub ticker: String,
    pub account_size: f64,
    pub analysis_period: String,
    pub status: JobStatus,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl DecisionJob {
    fn new(ticker: &str, account_size: f64, analysis_period: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            account_size,
            analysis_period: analysis_period.to_string(),
            status: JobStatus::Pending,
            result: None,
            error: None,
        }
    }

    fn start(&mut self) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.status = JobStatus::Running;
    }

    fn succeed(&mut self, report: String) {
        debug_assert_eq!(self.status, JobStatus::Running);
        self.status = JobStatus::Succeeded;
        self.result = Some(report);
    }

    fn fail(&mut self, error: String) {
        debug_assert_ne!(self.status, JobStatus::Succeeded);
        self.status = JobStatus::Failed;
        self.error = Some(error);
    }
}

/// Final per-ticker outcome handed back to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub ticker: String,
    pub status: JobStatus,
    pub report: Option<String>,
    pub error: Option<String>,
}

impl From<DecisionJob> for JobOutcome {
    fn from(job: DecisionJob) -> Self {
        Self {
            ticker: job.ticker,
            status: job.status,
            report: job.result,
            error: job.error,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Everything one worker needs; cloned into each spawned job.
#[derive(Clone)]
struct JobEnv {
    provider: Arc<dyn MarketDataProvider>,
    engine: Arc<dyn DecisionEngine>,
    aggregator: Arc<SentimentAggregator>,
    store: Arc<ResultStore>,
    decision_timeout: Duration,
    message_cap: usize,
    current_portfolio: String,
}

/// Bounded-concurrency scheduler for decision jobs.
pub struct Dispatcher {
    env: JobEnv,
    concurrency: usize,
    account_size: f64,
    analysis_period: String,
}

impl Dispatcher {
    /// Create a dispatcher from pipeline configuration and collaborators.
    pub fn new(
        config: &PipelineConfig,
        provider: Arc<dyn MarketDataProvider>,
        engine: Arc<dyn DecisionEngine>,
        aggregator: Arc<SentimentAggregator>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            env: JobEnv {
                provider,
                engine,
                aggregator,
                store,
                decision_timeout: Duration::from_secs(config.decision_timeout_secs),
                message_cap: config.social_message_cap,
                current_portfolio: config.current_portfolio.clone(),
            },
            concurrency: config.batch_size.max(1),
            account_size: config.account_size,
            analysis_period: config.analysis_period.clone(),
        }
    }

    /// Run one decision job per candidate ticker.
    ///
    /// Returns exactly one outcome per input ticker, in submission order,
    /// regardless of completion order. No error from any single job crosses
    /// this boundary; failures are data in the outcome.
    pub async fn run(&self, candidates: &[String]) -> Vec<JobOutcome> {
        let gate = Arc::new(Semaphore::new(self.concurrency));

        info!(
            jobs = candidates.len(),
            concurrency = self.concurrency,
            "Dispatching decision jobs"
        );

        let handles: Vec<_> = candidates
            .iter()
            .map(|ticker| {
                let job = DecisionJob::new(ticker, self.account_size, &self.analysis_period);
                let env = self.env.clone();
                let gate = Arc::clone(&gate);
                tokio::spawn(execute(env, job, gate))
            })
            .collect();

        candidates
            .iter()
            .zip(join_all(handles).await)
            .map(|(ticker, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Decision job worker aborted");
                    JobOutcome {
                        ticker: ticker.clone(),
                        status: JobStatus::Failed,
                        report: None,
                        error: Some(format!("worker aborted: {}", e)),
                    }
                }
            })
            .collect()
    }
}

/// Run one job to its terminal state.
async fn execute(env: JobEnv, mut job: DecisionJob, gate: Arc<Semaphore>) -> JobOutcome {
    // Admission: suspend until a slot frees. The owned permit is dropped on
    // every return path below, releasing exactly one slot.
    let _permit = match gate.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            job.fail("admission gate closed".into());
            return job.into();
        }
    };

    job.start();
    info!(ticker = %job.ticker, job_id = %job.id, "Decision job admitted");

    // A dead social feed is not fatal: the aggregator turns an empty window
    // into an explicit no-signal summary.
    let messages = match env
        .provider
        .social_messages(&job.ticker, env.message_cap)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            warn!(ticker = %job.ticker, error = %e, "Social feed unavailable, continuing without signal");
            Vec::new()
        }
    };

    let sentiment = env.aggregator.aggregate(&job.ticker, &messages);

    let request = DecisionRequest {
        ticker: job.ticker.clone(),
        account_size: job.account_size,
        analysis_period: job.analysis_period.clone(),
        current_portfolio: env.current_portfolio.clone(),
        sentiment: Some(sentiment),
    };

    match tokio::time::timeout(env.decision_timeout, env.engine.analyze(&request)).await {
        Ok(Ok(report)) => {
            // Persistence failure is a tolerated degradation; the report
            // still reaches the caller through the outcome.
            if let Err(e) = env.store.persist(&job.ticker, &report).await {
                warn!(ticker = %job.ticker, error = %e, "Failed to persist analysis record");
            }
            info!(ticker = %job.ticker, "Decision job succeeded");
            job.succeed(report);
        }
        Ok(Err(e)) => {
            warn!(ticker = %job.ticker, error = %e, "Decision job failed");
            job.fail(format!("{:#}", e));
        }
        Err(_) => {
            warn!(
                ticker = %job.ticker,
                timeout_secs = env.decision_timeout.as_secs(),
                "Decision job timed out"
            );
            job.fail(format!(
                "decision engine timed out after {}s",
                env.decision_timeout.as_secs()
            ));
        }
    }

    job.into()
}
