//! Multi-source sentiment aggregation over social message feeds.
//!
//! Converts a bounded window of trader messages into a normalized score,
//! trend classification, and categorical label. Explicit Bullish/Bearish
//! tags drive the categorical counts; untagged messages contribute a
//! text-derived polarity to the average only. The aggregator is pure and
//! side-effect-free: messages are supplied by the caller and every summary
//! is recomputed from scratch.

mod model;

pub use model::{LexiconModel, TextSentimentModel};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{ExplicitSentiment, SocialMessage};

/// Score contributed by an explicit Bullish (+) or Bearish (−) tag
const EXPLICIT_SCORE: f64 = 0.5;

/// Messages counted as "recent" for the trend split
const RECENT_WINDOW: usize = 10;

/// Minimum recent/older mean gap before the trend leaves Stable
const TREND_THRESHOLD: f64 = 0.1;

/// Influencer messages surfaced in the summary
const TOP_INFLUENCERS: usize = 3;

// ============================================================================
// Summary Types
// ============================================================================

/// Direction the conversation is moving, recent messages vs older ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentTrend {
    Improving,
    Declining,
    Stable,
    /// Fewer messages than the recent window; no comparison possible
    InsufficientData,
}

impl std::fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => write!(f, "Improving"),
            Self::Declining => write!(f, "Declining"),
            Self::Stable => write!(f, "Stable"),
            Self::InsufficientData => write!(f, "Insufficient Data"),
        }
    }
}

/// Categorical reading of the aggregate sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    VeryBearish,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeryBullish => write!(f, "Very Bullish"),
            Self::Bullish => write!(f, "Bullish"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Bearish => write!(f, "Bearish"),
            Self::VeryBearish => write!(f, "Very Bearish"),
        }
    }
}

/// One high-reach author surfaced from the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopInfluencer {
    pub author: String,
    pub followers: u64,
    /// Explicit stance the author tagged, if any
    pub stance: Option<ExplicitSentiment>,
}

/// Aggregated sentiment for one ticker's message window.
///
/// Invariant: `bullish_count + bearish_count + neutral_count == message_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub ticker: String,
    pub message_count: usize,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    /// Mean per-message score, always in [-1, 1]
    pub average_score: f64,
    pub trend: SentimentTrend,
    pub label: SentimentLabel,
    /// Up to three messages with the widest author reach, descending
    pub top_influencers: Vec<TopInfluencer>,
    /// True when the feed was empty: there is no signal, not a neutral one
    pub no_signal: bool,
}

impl SentimentSummary {
    /// Render the formatted report fragment forwarded to the decision engine.
    pub fn to_report(&self) -> String {
        if self.no_signal {
            return format!(
                "Social sentiment for ${}: no recent messages found. \
                 Very low trader interest; social momentum is not a factor.",
                self.ticker
            );
        }

        let mut out = format!(
            "Social sentiment for ${}:\n\
             Messages analyzed: {}\n\
             Overall: {} (score {:+.3}, trend {})\n\
             Breakdown: {} bullish / {} bearish / {} neutral\n",
            self.ticker,
            self.message_count,
            self.label,
            self.average_score,
            self.trend,
            self.bullish_count,
            self.bearish_count,
            self.neutral_count,
        );

        if !self.top_influencers.is_empty() {
            out.push_str("Top influencers:\n");
            for (i, influencer) in self.top_influencers.iter().enumerate() {
                let stance = influencer
                    .stance
                    .map_or_else(|| "Untagged".to_string(), |s| s.to_string());
                out.push_str(&format!(
                    "  {}. @{} ({} followers) - {}\n",
                    i + 1,
                    influencer.author,
                    influencer.followers,
                    stance
                ));
            }
        }

        out
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Stateless sentiment aggregator; safe to share across concurrent jobs.
pub struct SentimentAggregator {
    model: Arc<dyn TextSentimentModel>,
}

impl SentimentAggregator {
    /// Create an aggregator using the given polarity model.
    pub fn new(model: Arc<dyn TextSentimentModel>) -> Self {
        Self { model }
    }

    /// Create with the built-in lexicon model.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(LexiconModel::new()))
    }

    /// Aggregate a ticker's message window (most-recent-first) into a summary.
    ///
    /// An empty window returns a `no_signal` summary rather than an error;
    /// nothing on that path divides by the message count.
    pub fn aggregate(&self, ticker: &str, messages: &[SocialMessage]) -> SentimentSummary {
        if messages.is_empty() {
            return SentimentSummary {
                ticker: ticker.to_string(),
                message_count: 0,
                bullish_count: 0,
                bearish_count: 0,
                neutral_count: 0,
                average_score: 0.0,
                trend: SentimentTrend::InsufficientData,
                label: SentimentLabel::Neutral,
                top_influencers: Vec::new(),
                no_signal: true,
            };
        }

        let mut bullish_count = 0;
        let mut bearish_count = 0;
        let mut neutral_count = 0;
        let mut scores = Vec::with_capacity(messages.len());

        for message in messages {
            match message.explicit_sentiment {
                Some(ExplicitSentiment::Bullish) => {
                    bullish_count += 1;
                    scores.push(EXPLICIT_SCORE);
                }
                Some(ExplicitSentiment::Bearish) => {
                    bearish_count += 1;
                    scores.push(-EXPLICIT_SCORE);
                }
                None => {
                    // Untagged messages stay neutral in the counts; the text
                    // polarity only shades the average.
                    neutral_count += 1;
                    scores.push(self.model.polarity(&message.body).clamp(-1.0, 1.0));
                }
            }
        }

        let message_count = messages.len();
        let average_score = scores.iter().sum::<f64>() / message_count as f64;
        let trend = classify_trend(&scores);
        let label = classify_label(average_score, bullish_count, bearish_count, message_count);
        let top_influencers = top_influencers(messages);

        SentimentSummary {
            ticker: ticker.to_string(),
            message_count,
            bullish_count,
            bearish_count,
            neutral_count,
            average_score,
            trend,
            label,
            top_influencers,
            no_signal: false,
        }
    }
}

/// Compare the recent window's mean score to the remainder's.
fn classify_trend(scores: &[f64]) -> SentimentTrend {
    if scores.len() < RECENT_WINDOW {
        return SentimentTrend::InsufficientData;
    }

    let recent = mean(&scores[..RECENT_WINDOW]);
    let older_slice = &scores[RECENT_WINDOW..];
    // With exactly one window of messages there is nothing older to compare
    // against; the trend reads Stable.
    let older = if older_slice.is_empty() {
        recent
    } else {
        mean(older_slice)
    };

    if recent > older + TREND_THRESHOLD {
        SentimentTrend::Improving
    } else if recent < older - TREND_THRESHOLD {
        SentimentTrend::Declining
    } else {
        SentimentTrend::Stable
    }
}

/// Threshold ladder over the average score and categorical fractions,
/// first match wins.
fn classify_label(
    average_score: f64,
    bullish_count: usize,
    bearish_count: usize,
    message_count: usize,
) -> SentimentLabel {
    let bullish_fraction = bullish_count as f64 / message_count as f64;
    let bearish_fraction = bearish_count as f64 / message_count as f64;

    if average_score > 0.3 || bullish_fraction > 0.6 {
        SentimentLabel::VeryBullish
    } else if average_score > 0.1 || bullish_fraction > 0.5 {
        SentimentLabel::Bullish
    } else if average_score > -0.1 {
        SentimentLabel::Neutral
    } else if average_score > -0.3 || bearish_fraction > 0.5 {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::VeryBearish
    }
}

/// Up to three messages with the highest author reach, feed order on ties.
fn top_influencers(messages: &[SocialMessage]) -> Vec<TopInfluencer> {
    let mut ranked: Vec<&SocialMessage> = messages.iter().collect();
    // sort_by is stable, so equal follower counts keep feed order
    ranked.sort_by(|a, b| b.author_followers.cmp(&a.author_followers));

    ranked
        .into_iter()
        .take(TOP_INFLUENCERS)
        .map(|m| TopInfluencer {
            author: m.author.clone(),
            followers: m.author_followers,
            stance: m.explicit_sentiment,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
