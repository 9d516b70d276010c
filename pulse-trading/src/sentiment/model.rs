//! Text polarity scoring for untagged social messages.
//!
//! The aggregator only needs one capability from a text model: a polarity
//! score in [-1, 1] for a message body. The trait keeps that capability
//! injectable so a heavier NLP backend can replace the built-in lexicon
//! without touching the aggregation logic.

/// Scores free text on a [-1, 1] polarity scale.
pub trait TextSentimentModel: Send + Sync {
    /// Polarity of `text`: negative bearish, positive bullish, 0 neutral.
    fn polarity(&self, text: &str) -> f64;
}

// ============================================================================
// Lexicon Model
// ============================================================================

/// Weighted finance-slang lexicon, sorted for binary search.
const LEXICON: &[(&str, f64)] = &[
    ("bagholder", -0.6),
    ("bankruptcy", -0.9),
    ("bearish", -0.8),
    ("beat", 0.6),
    ("breakout", 0.7),
    ("bullish", 0.8),
    ("buy", 0.5),
    ("calls", 0.4),
    ("crash", -0.8),
    ("downgrade", -0.6),
    ("drop", -0.5),
    ("dump", -0.7),
    ("gain", 0.5),
    ("gains", 0.5),
    ("growth", 0.4),
    ("long", 0.3),
    ("miss", -0.5),
    ("moon", 0.8),
    ("overvalued", -0.6),
    ("puts", -0.4),
    ("rally", 0.6),
    ("rip", 0.5),
    ("scam", -0.8),
    ("sell", -0.5),
    ("short", -0.3),
    ("soar", 0.7),
    ("strong", 0.5),
    ("tank", -0.7),
    ("undervalued", 0.6),
    ("upgrade", 0.6),
    ("upside", 0.5),
    ("weak", -0.5),
];

/// Default lexicon-based polarity model.
///
/// Averages the weights of matched tokens; text with no lexicon hits scores
/// a flat 0. Deliberately small: explicit trader tags carry the categorical
/// signal, this model only shades the average for untagged messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconModel;

impl LexiconModel {
    pub fn new() -> Self {
        Self
    }
}

impl TextSentimentModel for LexiconModel {
    fn polarity(&self, text: &str) -> f64 {
        let mut sum = 0.0;
        let mut hits = 0u32;

        for token in tokenize(text) {
            if let Ok(idx) = LEXICON.binary_search_by(|(word, _)| (*word).cmp(token.as_str())) {
                sum += LEXICON[idx].1;
                hits += 1;
            }
        }

        if hits == 0 {
            return 0.0;
        }

        (sum / f64::from(hits)).clamp(-1.0, 1.0)
    }
}

/// Lowercased alphanumeric tokens of `text`.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
