//! Pulse Trading - batch screening and decision dispatch pipeline.
//!
//! Screens the configured ticker universe, fans out bounded-concurrency
//! decision jobs for the survivors, and persists each completed analysis.

use std::sync::Arc;

use anyhow::Result;
use pulse_common::config::Config;
use pulse_common::logging::init_logging;
use pulse_trading::{PipelineContext, PipelineService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Pulse Trading v{}", env!("CARGO_PKG_VERSION"));

    // An unreachable result store is the only unrecoverable startup failure;
    // the propagated error exits non-zero.
    let ctx = PipelineContext::from_config(config).await?;
    let store = Arc::clone(&ctx.store);
    let service = PipelineService::new(ctx);

    let report = service.run_batch().await;

    // Job failures are data in the report, not process errors: the run still
    // exits 0 once the batch completes.
    println!("{}", report.summary_text());

    if report.succeeded > 0 {
        println!("Recorded decisions:");
        for record in store.recent(report.succeeded).await.unwrap_or_default() {
            println!(
                "  {}  {:<8} {}",
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.ticker,
                record.decision
            );
        }
    }

    Ok(())
}
