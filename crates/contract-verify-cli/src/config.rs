//! Runner configuration

use crate::error::VerifyError;

pub const ENV_BASE_URL: &str = "CONTRACT_VERIFY_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "CONTRACT_VERIFY_TIMEOUT_MS";
pub const ENV_CONCURRENCY: &str = "CONTRACT_VERIFY_CONCURRENCY";
pub const ENV_IGNORE_HEADER_CASE: &str = "CONTRACT_VERIFY_IGNORE_HEADER_CASE";

/// How contracts are executed against the service under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Base URL every contract path is appended to
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum number of contracts in flight at once
    pub concurrency: usize,

    /// Match expected header names ignoring ASCII case
    pub ignore_header_case: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
            concurrency: 8,
            ignore_header_case: false,
        }
    }
}

impl RunnerConfig {
    /// Create a new config builder
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source
    ///
    /// Unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup(ENV_BASE_URL).unwrap_or(defaults.base_url),
            timeout_ms: lookup(ENV_TIMEOUT_MS)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            concurrency: lookup(ENV_CONCURRENCY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.concurrency),
            ignore_header_case: lookup(ENV_IGNORE_HEADER_CASE)
                .map(|v| {
                    matches!(
                        v.trim().to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes" | "on"
                    )
                })
                .unwrap_or(defaults.ignore_header_case),
        }
    }

    /// Reject settings the runner cannot work with
    pub fn validate(&self) -> Result<(), VerifyError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            VerifyError::invalid_input(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VerifyError::invalid_input(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_ms == 0 {
            return Err(VerifyError::invalid_input("Timeout must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(VerifyError::invalid_input("Concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for RunnerConfig
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.config.timeout_ms = timeout;
        self
    }

    /// Set the concurrency limit
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn ignore_header_case(mut self, ignore: bool) -> Self {
        self.config.ignore_header_case = ignore;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RunnerConfig {
        self.config
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
