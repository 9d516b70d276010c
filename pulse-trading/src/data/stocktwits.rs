//! StockTwits adapter for the trader message stream.
//!
//! # API
//! `GET {base}/api/2/streams/symbol/{ticker}.json`
//!
//! No authentication is needed for basic access. Messages arrive
//! most-recent-first; authors may tag an explicit Bullish/Bearish stance,
//! which the aggregator prefers over text-derived polarity.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use pulse_common::config::ProviderEndpointConfig;

use super::provider::ProviderError;
use super::rate_limiter::RateLimiter;
use super::{ExplicitSentiment, SocialMessage};

/// Symbol stream endpoint path prefix
const STREAM_ENDPOINT: &str = "/api/2/streams/symbol";

/// HTTP timeout for one stream request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: u64,
    #[serde(default)]
    body: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    user: RawUser,
    #[serde(default)]
    entities: RawEntities,
}

#[derive(Debug, Deserialize, Default)]
struct RawUser {
    #[serde(default)]
    username: String,
    #[serde(default)]
    followers: u64,
}

#[derive(Debug, Deserialize, Default)]
struct RawEntities {
    #[serde(default)]
    sentiment: Option<RawSentiment>,
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    #[serde(default)]
    basic: String,
}

// ============================================================================
// Adapter
// ============================================================================

/// HTTP client for the StockTwits symbol stream.
pub struct StocktwitsClient {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl StocktwitsClient {
    /// Create a new stream client.
    pub fn new(config: &ProviderEndpointConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new("social", config.rate_limit_rpm),
        }
    }

    /// Fetch up to `limit` messages for a ticker, most-recent-first.
    ///
    /// An empty feed is not an error: it signals low trader interest, and the
    /// aggregator turns it into an explicit "no signal" summary.
    pub async fn stream(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<SocialMessage>, ProviderError> {
        if ticker.is_empty() {
            return Err(ProviderError::InvalidRequest("empty ticker".into()));
        }

        self.limiter.acquire().await;

        let url = format!("{}{}/{}.json", self.base_url, STREAM_ENDPOINT, ticker);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited(format!(
                    "social provider throttled request for {}",
                    ticker
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::DataNotAvailable(format!(
                    "unknown symbol {}",
                    ticker
                )));
            }
            status => {
                return Err(ProviderError::Network(format!(
                    "social provider returned HTTP {} for {}",
                    status, ticker
                )));
            }
        }

        let parsed: StreamResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let messages = messages_from_response(parsed, limit);
        debug!(ticker = %ticker, messages = messages.len(), "Fetched social messages");
        Ok(messages)
    }
}

/// Map the raw stream into domain messages, keeping feed order.
fn messages_from_response(response: StreamResponse, limit: usize) -> Vec<SocialMessage> {
    response
        .messages
        .into_iter()
        .take(limit)
        .map(|raw| SocialMessage {
            id: raw.id,
            explicit_sentiment: raw
                .entities
                .sentiment
                .as_ref()
                .and_then(|s| parse_stance(&s.basic)),
            author: raw.user.username,
            author_followers: raw.user.followers,
            created_at: parse_timestamp(&raw.created_at),
            body: raw.body,
        })
        .collect()
}

fn parse_stance(basic: &str) -> Option<ExplicitSentiment> {
    match basic {
        "Bullish" => Some(ExplicitSentiment::Bullish),
        "Bearish" => Some(ExplicitSentiment::Bearish),
        _ => None,
    }
}

/// Parse a message timestamp, falling back to the epoch when malformed.
///
/// Feed order carries the recency information the aggregator needs, so a bad
/// timestamp must not drop the message.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(json: &str) -> StreamResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_messages_from_response_maps_sentiment() {
        let response = sample_response(
            r#"{
                "messages": [
                    {
                        "id": 1,
                        "body": "to the moon",
                        "created_at": "2024-06-01T15:30:00Z",
                        "user": { "username": "bull", "followers": 1200 },
                        "entities": { "sentiment": { "basic": "Bullish" } }
                    },
                    {
                        "id": 2,
                        "body": "selling everything",
                        "created_at": "2024-06-01T15:00:00Z",
                        "user": { "username": "bear", "followers": 80 },
                        "entities": { "sentiment": { "basic": "Bearish" } }
                    },
                    {
                        "id": 3,
                        "body": "watching from the sidelines",
                        "created_at": "2024-06-01T14:00:00Z",
                        "user": { "username": "lurker", "followers": 5 },
                        "entities": { "sentiment": null }
                    }
                ]
            }"#,
        );

        let messages = messages_from_response(response, 30);
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[0].explicit_sentiment,
            Some(ExplicitSentiment::Bullish)
        );
        assert_eq!(
            messages[1].explicit_sentiment,
            Some(ExplicitSentiment::Bearish)
        );
        assert_eq!(messages[2].explicit_sentiment, None);
        assert_eq!(messages[0].author_followers, 1200);
        // Feed order preserved (most-recent-first)
        assert!(messages[0].created_at > messages[1].created_at);
    }

    #[test]
    fn test_messages_from_response_respects_limit() {
        let response = sample_response(
            r#"{
                "messages": [
                    { "id": 1, "body": "a", "created_at": "2024-06-01T15:30:00Z",
                      "user": { "username": "u1", "followers": 1 }, "entities": {} },
                    { "id": 2, "body": "b", "created_at": "2024-06-01T15:00:00Z",
                      "user": { "username": "u2", "followers": 2 }, "entities": {} }
                ]
            }"#,
        );

        let messages = messages_from_response(response, 1);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 1);
    }

    #[test]
    fn test_parse_timestamp_fallback() {
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::UNIX_EPOCH);
        let parsed = parse_timestamp("2024-06-01T15:30:00Z");
        assert_ne!(parsed, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_stance_unknown_is_none() {
        assert_eq!(parse_stance("Neutral"), None);
        assert_eq!(parse_stance(""), None);
    }
}
