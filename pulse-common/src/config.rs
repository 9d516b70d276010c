//! Configuration management for the Pulse pipeline.
//!
//! All Pulse binaries share a unified configuration file at `~/.pulse/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (PULSE_* prefix)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PULSE_LOG_LEVEL` → observability.log_level
//! - `PULSE_LOG_FORMAT` → observability.log_format
//! - `PULSE_TICKERS` → pipeline.tickers (comma-separated)
//! - `PULSE_BATCH_SIZE` → pipeline.batch_size
//! - `PULSE_DB_PATH` → pipeline.db_path
//! - `PULSE_ENGINE_ENDPOINT` → engine.endpoint

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".pulse"),
        |dirs| dirs.home_dir().join(".pulse"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Pipeline Configuration
// ============================================================================

/// Batch pipeline configuration: ticker universe, concurrency, and the
/// parameters forwarded to each decision job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ticker universe to screen
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Maximum number of decision jobs running concurrently.
    ///
    /// The downstream decision engine talks to rate-limited upstream
    /// providers; raising this past what those providers tolerate causes
    /// externally enforced throttling, not a speedup.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Account size forwarded to the decision engine (USD)
    #[serde(default = "default_account_size")]
    pub account_size: f64,

    /// Analysis window forwarded to the decision engine (1mo, 3mo, 6mo, 1y)
    #[serde(default = "default_analysis_period")]
    pub analysis_period: String,

    /// Current portfolio holdings forwarded to the decision engine
    #[serde(default = "default_current_portfolio")]
    pub current_portfolio: String,

    /// Maximum social messages scored per ticker
    #[serde(default = "default_message_cap")]
    pub social_message_cap: usize,

    /// Timeout for one decision-engine call, in seconds
    #[serde(default = "default_decision_timeout_secs")]
    pub decision_timeout_secs: u64,

    /// Path to the SQLite result database (default: ~/.pulse/trading.db)
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Tickers dispatched when screening rejects the whole universe.
    ///
    /// An empty screen still feeds the downstream stages with this fixed
    /// set of liquid names; see the screener module for the rationale.
    #[serde(default = "default_fallback_tickers")]
    pub fallback_tickers: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            batch_size: default_batch_size(),
            account_size: default_account_size(),
            analysis_period: default_analysis_period(),
            current_portfolio: default_current_portfolio(),
            social_message_cap: default_message_cap(),
            decision_timeout_secs: default_decision_timeout_secs(),
            db_path: None,
            fallback_tickers: default_fallback_tickers(),
        }
    }
}

impl PipelineConfig {
    /// Resolved database path, defaulting to `~/.pulse/trading.db`.
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("trading.db"))
    }
}

fn default_tickers() -> Vec<String> {
    [
        "AAPL", "TSLA", "NVDA", "AMD", "MSFT", "GOOGL", "AMZN", "META", "NFLX", "INTC",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_batch_size() -> usize {
    2
}

fn default_account_size() -> f64 {
    10_000.0
}

fn default_analysis_period() -> String {
    "3mo".into()
}

fn default_current_portfolio() -> String {
    "None".into()
}

fn default_message_cap() -> usize {
    30
}

fn default_decision_timeout_secs() -> u64 {
    180
}

fn default_fallback_tickers() -> Vec<String> {
    vec!["AAPL".into(), "MSFT".into()]
}

// ============================================================================
// Decision Engine Configuration
// ============================================================================

/// Decision engine endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the decision engine service
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,

    /// HTTP client timeout for engine calls, in seconds
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            timeout_secs: default_engine_timeout_secs(),
        }
    }
}

fn default_engine_endpoint() -> String {
    "http://127.0.0.1:4400".into()
}

fn default_engine_timeout_secs() -> u64 {
    180
}

// ============================================================================
// Data Provider Configuration
// ============================================================================

/// Endpoint plus rate limit for one upstream data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpointConfig {
    /// Base URL of the provider API
    pub endpoint: String,

    /// Proactive request budget (requests per minute)
    pub rate_limit_rpm: u32,
}

/// Upstream data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OHLCV bar source
    #[serde(default = "default_chart_provider")]
    pub chart: ProviderEndpointConfig,

    /// Social message feed source
    #[serde(default = "default_social_provider")]
    pub social: ProviderEndpointConfig,

    /// History range requested from the chart provider.
    ///
    /// Must cover at least 200 trading days or the screener cannot compute
    /// its long moving average and will exclude every ticker.
    #[serde(default = "default_chart_range")]
    pub chart_range: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            chart: default_chart_provider(),
            social: default_social_provider(),
            chart_range: default_chart_range(),
        }
    }
}

fn default_chart_provider() -> ProviderEndpointConfig {
    ProviderEndpointConfig {
        endpoint: "https://query1.finance.yahoo.com".into(),
        rate_limit_rpm: 120,
    }
}

fn default_social_provider() -> ProviderEndpointConfig {
    ProviderEndpointConfig {
        endpoint: "https://api.stocktwits.com".into(),
        rate_limit_rpm: 60,
    }
}

fn default_chart_range() -> String {
    "1y".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Unified Pulse configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Decision engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Upstream data provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable fallbacks.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("PULSE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("PULSE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(tickers) = std::env::var("PULSE_TICKERS") {
            let parsed: Vec<String> = tickers
                .split(',')
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.pipeline.tickers = parsed;
            }
        }
        if let Ok(size) = std::env::var("PULSE_BATCH_SIZE") {
            if let Ok(n) = size.parse::<usize>() {
                self.pipeline.batch_size = n.max(1);
            }
        }
        if let Ok(path) = std::env::var("PULSE_DB_PATH") {
            self.pipeline.db_path = Some(PathBuf::from(path));
        }
        if let Ok(endpoint) = std::env::var("PULSE_ENGINE_ENDPOINT") {
            self.engine.endpoint = endpoint;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.batch_size, 2);
        assert_eq!(config.pipeline.social_message_cap, 30);
        assert_eq!(config.pipeline.analysis_period, "3mo");
        assert_eq!(
            config.pipeline.fallback_tickers,
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        assert_eq!(config.providers.chart_range, "1y");
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "pipeline": {{ "tickers": ["IBM"], "batch_size": 4 }},
                "engine": {{ "endpoint": "http://10.0.0.1:9000" }}
            }}"#
        )
        .unwrap();

        let config = Config::load_from(&file.path().to_path_buf()).unwrap();
        assert_eq!(config.pipeline.tickers, vec!["IBM".to_string()]);
        assert_eq!(config.pipeline.batch_size, 4);
        assert_eq!(config.engine.endpoint, "http://10.0.0.1:9000");
        // Unspecified sections fall back to defaults
        assert_eq!(config.pipeline.analysis_period, "3mo");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_load_from_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load_from(&file.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = PipelineConfig::default();
        assert!(config.database_path().ends_with("trading.db"));
    }
}
