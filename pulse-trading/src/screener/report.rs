//! Diagnostic table rendering for screening runs.

use super::ScreenOutcome;

/// Text renderer for a screening outcome.
pub struct ScreenReport<'a> {
    outcome: &'a ScreenOutcome,
}

impl<'a> ScreenReport<'a> {
    /// Create a report over a screening outcome.
    pub fn new(outcome: &'a ScreenOutcome) -> Self {
        Self { outcome }
    }

    /// Render the ordered diagnostic table as plain text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{:<8} | {:<10} | {:<12} | STATUS\n",
            "TICKER", "PRICE", "TREND"
        ));
        out.push_str(&"-".repeat(46));
        out.push('\n');

        for result in &self.outcome.results {
            let status = if result.passed { "PASSED" } else { "REJECTED" };
            out.push_str(&format!(
                "{:<8} | ${:<9.2} | {:<12} | {}\n",
                result.ticker,
                result.latest_close,
                result.trend_label.to_string(),
                status
            ));
        }

        out.push_str(&"-".repeat(46));
        out.push('\n');

        if self.outcome.fallback_used {
            out.push_str(&format!(
                "No candidates passed; falling back to {}\n",
                self.outcome.candidates.join(", ")
            ));
        } else {
            out.push_str(&format!(
                "{} candidate(s) for decision analysis\n",
                self.outcome.candidates.len()
            ));
        }

        out
    }
}
