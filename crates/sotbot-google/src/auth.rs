//! OAuth2 bearer-token source for the Sheets and Drive clients. Tokens come
//! either from the environment (static) or from an authorized-user
//! credentials file exchanged at Google's token endpoint.

use std::path::Path;

use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::{build_http_client, GoogleError, RequestConfig};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Leeway subtracted from the reported token lifetime so a token is never
/// used in the last minute before it expires server-side.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// The `authorized_user` credentials file written by `gcloud auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl AuthorizedUserCredentials {
    /// Load and validate a credentials file.
    ///
    /// # Errors
    /// Returns [`GoogleError::Token`] when the file is missing required
    /// fields, or [`GoogleError::Io`] when it cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, GoogleError> {
        let body = std::fs::read_to_string(path)?;
        let credentials: Self = serde_json::from_str(&body)
            .map_err(|err| GoogleError::Token(format!("invalid credentials file: {err}")))?;
        if credentials.refresh_token.trim().is_empty() {
            return Err(GoogleError::Token("credentials file has no refresh_token".to_string()));
        }
        Ok(credentials)
    }
}

#[derive(Debug)]
enum TokenSource {
    Fixed(String),
    AuthorizedUser(AuthorizedUserCredentials),
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Expiry-aware token cache shared by every Google client.
pub struct TokenProvider {
    http: reqwest::Client,
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// A provider that always hands out one pre-issued token. Useful for
    /// short-lived runs and tests.
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            http: build_http_client(&RequestConfig::default()),
            source: TokenSource::Fixed(token.into()),
            cached: Mutex::new(None),
        }
    }

    /// A provider that exchanges a refresh token for access tokens on
    /// demand and caches them until shortly before expiry.
    #[must_use]
    pub fn authorized_user(credentials: AuthorizedUserCredentials) -> Self {
        Self {
            http: build_http_client(&RequestConfig::default()),
            source: TokenSource::AuthorizedUser(credentials),
            cached: Mutex::new(None),
        }
    }

    /// A ready-to-use `Authorization` header value.
    ///
    /// # Errors
    /// Returns an error when the token exchange fails.
    pub async fn bearer(&self) -> Result<String, GoogleError> {
        match &self.source {
            TokenSource::Fixed(token) => Ok(format!("Bearer {token}")),
            TokenSource::AuthorizedUser(credentials) => {
                let mut cached = self.cached.lock().await;
                let now = OffsetDateTime::now_utc();

                if let Some(token) = cached.as_ref() {
                    if token.expires_at > now {
                        return Ok(format!("Bearer {}", token.token));
                    }
                }

                tracing::debug!("refreshing google access token");
                let token = self.exchange_refresh_token(credentials).await?;
                let header = format!("Bearer {}", token.token);
                *cached = Some(token);
                Ok(header)
            }
        }
    }

    async fn exchange_refresh_token(
        &self,
        credentials: &AuthorizedUserCredentials,
    ) -> Result<CachedToken, GoogleError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Token(format!("token exchange failed: HTTP {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| GoogleError::Token(format!("invalid token response: {err}")))?;

        let lifetime = Duration::seconds((token.expires_in - EXPIRY_LEEWAY_SECS).max(0));
        Ok(CachedToken {
            token: token.access_token,
            expires_at: OffsetDateTime::now_utc() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_parse_from_gcloud_layout() {
        let body = r#"{
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "refresh_token": "1//refresh",
            "type": "authorized_user"
        }"#;
        let credentials: Result<AuthorizedUserCredentials, _> = serde_json::from_str(body);
        let Ok(credentials) = credentials else {
            panic!("credentials should parse");
        };
        assert_eq!(credentials.refresh_token, "1//refresh");
    }

    #[tokio::test]
    async fn fixed_provider_never_hits_the_network() {
        let provider = TokenProvider::fixed("abc");
        let header = match provider.bearer().await {
            Ok(header) => header,
            Err(err) => panic!("fixed provider failed: {err}"),
        };
        assert_eq!(header, "Bearer abc");
    }
}
