//! HTTP bridge to the decision engine service.
//!
//! Sends one analysis request per job and returns the engine's text report
//! verbatim. Deliberately retry-free: the engine sits on rate-limited
//! upstream providers, and the dispatcher records failures as job outcomes
//! instead of hammering the service again.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use pulse_common::config::EngineConfig;

use super::{DecisionEngine, DecisionRequest};

/// Analysis endpoint path
const ANALYZE_ENDPOINT: &str = "/api/v1/analyze";

// ============================================================================
// Wire Types
// ============================================================================

/// Request body for the engine's analyze endpoint.
#[derive(Debug, Serialize)]
struct EngineCallRequest<'a> {
    ticker: &'a str,
    account_size: f64,
    analysis_period: &'a str,
    current_portfolio: &'a str,
    /// Rendered sentiment fragment, when a summary is available
    #[serde(skip_serializing_if = "Option::is_none")]
    sentiment_context: Option<String>,
}

/// Response body from the engine's analyze endpoint.
#[derive(Debug, Deserialize)]
struct EngineCallResponse {
    /// The natural-language trading report
    content: String,
    #[serde(default)]
    metadata: Option<EngineMetadata>,
}

/// Optional usage metadata from the engine.
#[derive(Debug, Deserialize, Default)]
struct EngineMetadata {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

// ============================================================================
// Bridge
// ============================================================================

/// HTTP client for the decision engine service.
pub struct EngineBridge {
    client: reqwest::Client,
    endpoint: String,
}

impl EngineBridge {
    /// Create a bridge from engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DecisionEngine for EngineBridge {
    async fn analyze(&self, request: &DecisionRequest) -> Result<String> {
        let url = format!("{}{}", self.endpoint, ANALYZE_ENDPOINT);
        let body = EngineCallRequest {
            ticker: &request.ticker,
            account_size: request.account_size,
            analysis_period: &request.analysis_period,
            current_portfolio: &request.current_portfolio,
            sentiment_context: request.sentiment.as_ref().map(|s| s.to_report()),
        };

        debug!(ticker = %request.ticker, url = %url, "Calling decision engine");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Decision engine unreachable for {}", request.ticker))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!(
                "Decision engine returned HTTP {} for {}: {}",
                status,
                request.ticker,
                detail
            );
        }

        let parsed: EngineCallResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed engine response for {}", request.ticker))?;

        if let Some(meta) = &parsed.metadata {
            info!(
                ticker = %request.ticker,
                model = meta.model.as_deref().unwrap_or("unknown"),
                input_tokens = meta.input_tokens.unwrap_or(0),
                output_tokens = meta.output_tokens.unwrap_or(0),
                "Decision engine call completed"
            );
        }

        Ok(parsed.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let body = EngineCallRequest {
            ticker: "AAPL",
            account_size: 10_000.0,
            analysis_period: "3mo",
            current_portfolio: "None",
            sentiment_context: Some("Social sentiment for $AAPL".into()),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["account_size"], 10_000.0);
        assert_eq!(json["analysis_period"], "3mo");
        assert_eq!(json["current_portfolio"], "None");
        assert!(json["sentiment_context"]
            .as_str()
            .unwrap()
            .contains("AAPL"));
    }

    #[test]
    fn test_request_omits_missing_sentiment() {
        let body = EngineCallRequest {
            ticker: "TSLA",
            account_size: 5_000.0,
            analysis_period: "1mo",
            current_portfolio: "None",
            sentiment_context: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sentiment_context").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let parsed: EngineCallResponse = serde_json::from_str(
            r#"{
                "content": "Analysis...\nDECISION: BUY",
                "metadata": { "model": "engine-v2", "input_tokens": 1200, "output_tokens": 400 }
            }"#,
        )
        .unwrap();

        assert!(parsed.content.contains("DECISION: BUY"));
        let meta = parsed.metadata.unwrap();
        assert_eq!(meta.model.as_deref(), Some("engine-v2"));
        assert_eq!(meta.input_tokens, Some(1200));
        assert_eq!(meta.output_tokens, Some(400));
    }

    #[test]
    fn test_response_parsing_without_metadata() {
        let parsed: EngineCallResponse =
            serde_json::from_str(r#"{ "content": "HOLD for now" }"#).unwrap();
        assert_eq!(parsed.content, "HOLD for now");
        assert!(parsed.metadata.is_none());
    }
}
