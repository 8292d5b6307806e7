//! Google Workspace clients: Sheets values access, Drive uploads and the
//! OAuth2 token source both share.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod auth;
mod drive;
mod sheets;

pub use auth::{AuthorizedUserCredentials, TokenProvider};
pub use drive::DriveClient;
pub use sheets::SheetsClient;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Authentication failed - check your Google credentials")]
    AuthFailed,
    #[error("Rate limited - try again later")]
    RateLimited,
    #[error("Request timeout")]
    Timeout,
    #[error("Token error: {0}")]
    Token(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request configuration shared by the Sheets and Drive clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Number of retries for transient errors (default: 2)
    pub max_retries: u32,
    /// Retry delay in milliseconds (default: 1000)
    pub retry_delay_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_secs: 30, max_retries: 2, retry_delay_ms: 1000 }
    }
}

pub(crate) fn build_http_client(config: &RequestConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Execute a request with retry logic for transient errors.
/// Does NOT retry on auth errors (401/403) or rate limits (429).
pub(crate) async fn execute_with_retry<F, Fut>(
    config: &RequestConfig,
    request_fn: F,
) -> Result<reqwest::Response, GoogleError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match request_fn().await {
            Ok(response) => {
                let status = response.status();

                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(GoogleError::AuthFailed);
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(GoogleError::RateLimited);
                }

                if status.is_success() {
                    return Ok(response);
                }

                if status.is_server_error() {
                    last_error = Some(GoogleError::Api(format!("Server error: {status}")));
                    if attempt < config.max_retries {
                        tokio::time::sleep(Duration::from_millis(
                            config.retry_delay_ms * (u64::from(attempt) + 1),
                        ))
                        .await;
                        continue;
                    }
                }

                let body = response.text().await.unwrap_or_default();
                return Err(GoogleError::Api(format!("HTTP {status}: {body}")));
            }
            Err(err) => {
                if err.is_timeout() {
                    last_error = Some(GoogleError::Timeout);
                } else if err.is_connect() || err.is_request() {
                    last_error = Some(GoogleError::Request(err));
                } else {
                    return Err(GoogleError::Request(err));
                }

                if attempt < config.max_retries {
                    tokio::time::sleep(Duration::from_millis(
                        config.retry_delay_ms * (u64::from(attempt) + 1),
                    ))
                    .await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| GoogleError::Api("Unknown error".to_string())))
}
