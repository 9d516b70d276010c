//! Technical eligibility screening over OHLCV series.
//!
//! The screener is a pure function over a batch of daily bar series: it
//! computes trailing moving averages for each ticker, evaluates the latest
//! bar against fixed price/liquidity/trend predicates, and produces an
//! ordered diagnostic table plus the candidate list handed to the
//! dispatcher. It holds no state across calls and never returns an error to
//! its caller; per-ticker problems exclude that ticker only.

mod report;

pub use report::ScreenReport;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::OhlcvBar;

/// Closing-price window for the short trend average
const SHORT_SMA_WINDOW: usize = 50;

/// Closing-price window for the long trend average
const LONG_SMA_WINDOW: usize = 200;

/// Volume window for the liquidity average
const VOLUME_WINDOW: usize = 20;

// ============================================================================
// Screen Result
// ============================================================================

/// Trend classification attached to every screened ticker.
///
/// Passing tickers get `Bullish`/`Recovering` based on the long average;
/// rejected tickers carry the first failing predicate, checked in the order
/// liquidity, crash, price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    /// Passed, trading above the 200-bar average
    Bullish,
    /// Passed, still below the 200-bar average
    Recovering,
    /// Rejected: more than 10% below the 50-bar average
    Downtrend,
    /// Rejected: 20-bar average volume too thin
    LowVolume,
    /// Rejected: price under the minimum
    PennyStock,
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Recovering => write!(f, "Recovering"),
            Self::Downtrend => write!(f, "Downtrend"),
            Self::LowVolume => write!(f, "Low Volume"),
            Self::PennyStock => write!(f, "Penny Stock"),
        }
    }
}

/// Screening verdict for one ticker. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenResult {
    /// Ticker symbol
    pub ticker: String,
    /// Close of the latest bar
    pub latest_close: f64,
    /// Trend classification (or rejection reason)
    pub trend_label: TrendLabel,
    /// Whether all predicates held on the latest bar
    pub passed: bool,
}

/// Output of one screening run over a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenOutcome {
    /// Ordered diagnostic table, one row per screenable ticker
    pub results: Vec<ScreenResult>,
    /// Tickers eligible for decision analysis
    pub candidates: Vec<String>,
    /// True when the fixed fallback set replaced an empty candidate list
    pub fallback_used: bool,
}

// ============================================================================
// Screener
// ============================================================================

/// Screening thresholds.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Minimum latest close (excludes micro-cap noise)
    pub min_price: f64,
    /// Minimum 20-bar average volume
    pub min_avg_volume: f64,
    /// Fraction of the 50-bar average the close must stay above
    pub crash_tolerance: f64,
    /// Candidates substituted when the whole batch is rejected
    pub fallback_tickers: Vec<String>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            min_avg_volume: 500_000.0,
            crash_tolerance: 0.9,
            fallback_tickers: vec!["AAPL".into(), "MSFT".into()],
        }
    }
}

/// Batch screener over daily OHLCV series.
pub struct Screener {
    config: ScreenerConfig,
}

impl Screener {
    /// Create a new screener with the given thresholds.
    pub fn new(config: ScreenerConfig) -> Self {
        Self { config }
    }

    /// Create with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(ScreenerConfig::default())
    }

    /// Screen a batch of `(ticker, bars)` pairs.
    ///
    /// Tickers with an empty series or too little history for the moving
    /// average windows are skipped from the table entirely. When nothing
    /// passes, the candidate list falls back to the configured fixed set —
    /// an intentional safety net so the downstream stages always have at
    /// least one job to run, not an accident. The call itself never fails.
    pub fn screen(&self, batch: &[(String, Vec<OhlcvBar>)]) -> ScreenOutcome {
        let mut results = Vec::with_capacity(batch.len());
        let mut candidates = Vec::new();

        for (ticker, bars) in batch {
            match self.evaluate(ticker, bars) {
                Some(result) => {
                    if result.passed {
                        candidates.push(result.ticker.clone());
                    }
                    results.push(result);
                }
                None => {
                    debug!(ticker = %ticker, bars = bars.len(), "Skipped: insufficient history");
                }
            }
        }

        let fallback_used = candidates.is_empty();
        if fallback_used {
            info!(
                fallback = ?self.config.fallback_tickers,
                "No tickers passed screening, using fallback set"
            );
            candidates = self.config.fallback_tickers.clone();
        }

        ScreenOutcome {
            results,
            candidates,
            fallback_used,
        }
    }

    /// Evaluate one ticker's latest bar against the predicates.
    ///
    /// Returns `None` when any required window cannot be computed from the
    /// available history.
    fn evaluate(&self, ticker: &str, bars: &[OhlcvBar]) -> Option<ScreenResult> {
        let latest_close = bars.last()?.close;
        let sma_short = trailing_mean(bars, SHORT_SMA_WINDOW, |b| b.close)?;
        let sma_long = trailing_mean(bars, LONG_SMA_WINDOW, |b| b.close)?;
        let avg_volume = trailing_mean(bars, VOLUME_WINDOW, |b| b.volume)?;

        let valid_price = latest_close > self.config.min_price;
        let liquid = avg_volume > self.config.min_avg_volume;
        let not_crashing = latest_close > self.config.crash_tolerance * sma_short;

        let passed = valid_price && liquid && not_crashing;

        // Rejection reasons follow predicate precedence: liquidity first,
        // then crash, then price.
        let trend_label = if passed {
            if latest_close > sma_long {
                TrendLabel::Bullish
            } else {
                TrendLabel::Recovering
            }
        } else if !liquid {
            TrendLabel::LowVolume
        } else if !not_crashing {
            TrendLabel::Downtrend
        } else {
            TrendLabel::PennyStock
        };

        Some(ScreenResult {
            ticker: ticker.to_string(),
            latest_close,
            trend_label,
            passed,
        })
    }
}

/// Mean of the last `window` bars, using only already-observed values.
fn trailing_mean(bars: &[OhlcvBar], window: usize, value: impl Fn(&OhlcvBar) -> f64) -> Option<f64> {
    if window == 0 || bars.len() < window {
        return None;
    }

    let sum: f64 = bars[bars.len() - window..].iter().map(value).sum();
    Some(sum / window as f64)
}
