//! HTTP executor for contract requests
//!
//! Sends one contract request to the service under test and captures the
//! response as an [`ActualResponse`].

use contract_verify_core::{ActualResponse, ContractRequest};
use std::error::Error as _;
use std::time::Duration;

use crate::config::RunnerConfig;

/// Executor errors
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The service could not be reached: connection refused, DNS failure or timeout
    #[error("Could not reach {address}:{port} ({code})")]
    Unreachable {
        address: String,
        port: u16,
        code: String,
    },

    /// The request could not be built from the contract
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The exchange started but failed before a full response arrived
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Sends contract requests relative to a base URL
pub struct HttpExecutor {
    base_url: String,
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor for the configured base URL and timeout
    pub fn new(config: &RunnerConfig) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                ExecutorError::InvalidRequest(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Full URL for a contract path, query params appended in declaration order
    pub fn url_for(&self, request: &ContractRequest) -> Result<reqwest::Url, ExecutorError> {
        let path = if request.path.starts_with('/') {
            request.path.clone()
        } else {
            format!("/{}", request.path)
        };

        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            ExecutorError::InvalidRequest(format!("Invalid URL for '{}': {}", path, e))
        })?;

        if let Some(params) = &request.params {
            let mut pairs = url.query_pairs_mut();
            for param in params {
                pairs.append_pair(&param.name, &param.value_text());
            }
        }
        Ok(url)
    }

    /// Send the request and capture status, headers and body
    pub async fn execute(
        &self,
        request: &ContractRequest,
    ) -> Result<ActualResponse, ExecutorError> {
        let url = self.url_for(request)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| ExecutorError::InvalidRequest(e.to_string()))?;

        tracing::debug!(method = %method, url = %url, "sending request");

        let mut builder = self.client.request(method, url.clone());
        for header in request.headers.iter().flatten() {
            builder = builder.header(header.name.as_str(), header.value_text());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| classify(e, &url))?;

        let mut actual = ActualResponse::new(response.status().as_u16());
        for (name, value) in response.headers() {
            actual = actual.with_header(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        tracing::debug!(status = actual.status_code, bytes = text.len(), "response received");
        Ok(actual.with_raw_body(&text))
    }
}

fn classify(err: reqwest::Error, url: &reqwest::Url) -> ExecutorError {
    if err.is_builder() {
        return ExecutorError::InvalidRequest(err.to_string());
    }
    if err.is_connect() || err.is_timeout() {
        return ExecutorError::Unreachable {
            address: url.host_str().unwrap_or_default().to_string(),
            port: url.port_or_known_default().unwrap_or_default(),
            code: error_code(&err),
        };
    }
    ExecutorError::Transport(err.to_string())
}

/// Conventional errno-style name for a connectivity failure
fn error_code(err: &reqwest::Error) -> String {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
                std::io::ErrorKind::ConnectionReset => "ECONNRESET",
                std::io::ErrorKind::ConnectionAborted => "ECONNABORTED",
                std::io::ErrorKind::TimedOut => "ETIMEDOUT",
                std::io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
                _ => "EIO",
            }
            .to_string();
        }
        source = cause.source();
    }

    if err.is_timeout() {
        "ETIMEDOUT".to_string()
    } else {
        "ECONNREFUSED".to_string()
    }
}
