//! Configuration module for loading and parsing TOML configuration files.

use nse_client::{
    BrowserHeaders, ClientConfig, DEFAULT_BASE_URL, DEFAULT_COOKIE_CACHE, DEFAULT_RETRY_INTERVAL,
    DEFAULT_TIMEOUT, RetryPolicy, SymbolKind,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream and retry settings.
    pub client: ClientSection,
    /// Header overrides merged over the browser defaults.
    pub headers: BTreeMap<String, String>,
    /// Cookie cache settings.
    pub cache: CacheConfig,
    /// Log level and destination.
    pub logging: LoggingConfig,
    /// Symbols to scrape.
    pub scraper: ScraperConfig,
}

/// Upstream and retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Site root, e.g. "https://www.nseindia.com".
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum attempts per request; `0` retries until success.
    pub max_retries: u32,
    /// Pause between attempts in milliseconds.
    pub retry_interval_ms: u64,
    /// Optional overall deadline per call in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: nse_client::DEFAULT_MAX_ATTEMPTS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            deadline_secs: None,
        }
    }
}

/// Cookie cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cookies are persisted between runs.
    pub enabled: bool,
    /// Cache file path.
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_COOKIE_CACHE),
        }
    }
}

/// Log level and destination.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily log files; stdout only when absent.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// Scraper configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Index symbols (e.g., "NIFTY", "BANKNIFTY").
    pub indices: Vec<String>,
    /// Equity symbols (e.g., "RELIANCE").
    pub equities: Vec<String>,
    /// Seconds between rounds; `0` scrapes once and exits.
    pub interval_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            indices: vec!["NIFTY".to_string(), "BANKNIFTY".to_string()],
            equities: Vec::new(),
            interval_secs: 0,
        }
    }
}

impl ScraperConfig {
    /// Configured symbols with their kind, indices first.
    #[must_use]
    pub fn targets(&self) -> Vec<(String, SymbolKind)> {
        self.indices
            .iter()
            .map(|s| (s.clone(), SymbolKind::Index))
            .chain(self.equities.iter().map(|s| (s.clone(), SymbolKind::Equity)))
            .collect()
    }

    /// Interval between rounds, `None` for a single round.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.client.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(format!(
                "client.base_url must be an http(s) URL, got {base_url:?}"
            )));
        }
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "client.timeout_secs must be positive".to_string(),
            ));
        }
        if self.client.deadline_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "client.deadline_secs must be positive".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "logging.level cannot be empty".to_string(),
            ));
        }

        let targets = self.scraper.targets();
        if targets.is_empty() {
            return Err(ConfigError::InvalidValue(
                "at least one scraper symbol must be configured".to_string(),
            ));
        }
        if targets.iter().any(|(symbol, _)| symbol.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "scraper symbol cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy described by `[client]`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::from_max_retries(self.client.max_retries)
            .with_interval(Duration::from_millis(self.client.retry_interval_ms));
        match self.client.deadline_secs {
            Some(secs) => policy.with_deadline(Duration::from_secs(secs)),
            None => policy,
        }
    }

    /// Browser defaults with `[headers]` applied on top.
    #[must_use]
    pub fn browser_headers(&self) -> BrowserHeaders {
        self.headers
            .iter()
            .fold(BrowserHeaders::default(), |headers, (name, value)| {
                headers.with(name, value)
            })
    }

    /// Builds the HTTP client configuration.
    #[must_use]
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.client.base_url.trim().to_string(),
            timeout: Duration::from_secs(self.client.timeout_secs),
            retry: self.retry_policy(),
            headers: self.browser_headers(),
            cookie_cache: self.cache.enabled.then(|| self.cache.path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[client]
base_url = "http://127.0.0.1:3000"
timeout_secs = 10
max_retries = 5
retry_interval_ms = 250
deadline_secs = 60

[headers]
User-Agent = "nse-chain/0.2"
referer = "https://www.nseindia.com/option-chain"

[cache]
enabled = false

[logging]
level = "debug"
dir = "logs"

[scraper]
indices = ["NIFTY"]
equities = ["RELIANCE", "TCS"]
interval_secs = 30
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.client.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.dir, Some(PathBuf::from("logs")));
        assert_eq!(config.scraper.interval(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.scraper.targets(),
            vec![
                ("NIFTY".to_string(), SymbolKind::Index),
                ("RELIANCE".to_string(), SymbolKind::Equity),
                ("TCS".to_string(), SymbolKind::Equity),
            ]
        );

        let client = config.to_client_config();
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.cookie_cache, None);
        assert_eq!(client.retry.interval, Duration::from_millis(250));
        assert_eq!(client.retry.deadline, Some(Duration::from_secs(60)));
        assert!(!client.retry.is_unlimited());
        assert_eq!(client.headers.get("user-agent"), Some("nse-chain/0.2"));
        assert_eq!(
            client.headers.get("referer"),
            Some("https://www.nseindia.com/option-chain")
        );
        assert_eq!(client.headers.get("cache-control"), Some("no-cache"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").expect("should parse");
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.scraper.interval(), None);

        let client = config.to_client_config();
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.retry, RetryPolicy::default());
        assert_eq!(client.headers, BrowserHeaders::default());
        assert_eq!(client.cookie_cache, Some(PathBuf::from(DEFAULT_COOKIE_CACHE)));
    }

    #[test]
    fn test_zero_max_retries_is_unlimited() {
        let config = Config::parse("[client]\nmax_retries = 0\n").expect("should parse");
        assert!(config.retry_policy().is_unlimited());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for content in [
            "[client]\nbase_url = \"ftp://example.com\"\n",
            "[client]\ntimeout_secs = 0\n",
            "[client]\ndeadline_secs = 0\n",
            "[logging]\nlevel = \" \"\n",
            "[scraper]\nindices = []\n",
            "[scraper]\nindices = [\"\"]\n",
        ] {
            let err = Config::parse(content).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(_)), "{content}");
        }
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("[client\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
