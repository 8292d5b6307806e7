//! Minimal Telegram Bot API client: long polling, messages with reply and
//! inline keyboards, callback answers and file downloads.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

mod types;

pub use types::{
    CallbackQuery, Chat, Document, FileInfo, InlineKeyboardButton, InlineKeyboardMarkup,
    KeyboardButton, Message, PhotoSize, ReplyKeyboardMarkup, ReplyMarkup, Update, User,
};

const API_HOST: &str = "https://api.telegram.org";

/// Per-request timeout for everything except long polling.
const CALL_TIMEOUT_SECS: u64 = 30;

/// Slack added on top of the long-poll timeout so the server side always
/// closes the request first.
const POLL_TIMEOUT_SLACK_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Bot API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TelegramError::Api("ok response without result".to_string()));
        }
        if let Some(retry_after) = self.parameters.and_then(|p| p.retry_after) {
            return Err(TelegramError::RateLimited { retry_after });
        }
        Err(TelegramError::Api(
            self.description.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

pub struct BotClient {
    http: reqwest::Client,
    api_base: String,
    file_base: String,
}

impl BotClient {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            // No global timeout: long polls set their own per-request one.
            http: reqwest::Client::new(),
            api_base: format!("{API_HOST}/bot{token}"),
            file_base: format!("{API_HOST}/file/bot{token}"),
        }
    }

    async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{method}", self.api_base);
        let response = self.http.post(url).timeout(timeout).json(body).send().await?;
        let envelope: ApiResponse<T> = response.json().await?;
        envelope.into_result()
    }

    /// Fetches the next batch of updates, blocking server-side for up to
    /// `timeout_secs`.
    ///
    /// # Errors
    /// Returns an error when the request or the Bot API call fails.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = Map::new();
        body.insert("timeout".to_string(), json!(timeout_secs));
        body.insert(
            "allowed_updates".to_string(),
            json!(["message", "callback_query"]),
        );
        if let Some(offset) = offset {
            body.insert("offset".to_string(), json!(offset));
        }
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs + POLL_TIMEOUT_SLACK_SECS),
        )
        .await
    }

    /// Sends a text message, optionally with a keyboard.
    ///
    /// # Errors
    /// Returns an error when the request or the Bot API call fails.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<Message, TelegramError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("text".to_string(), json!(text));
        if let Some(markup) = reply_markup {
            body.insert("reply_markup".to_string(), serde_json::to_value(markup)?);
        }
        self.call("sendMessage", &body, Duration::from_secs(CALL_TIMEOUT_SECS)).await
    }

    /// Replaces the text (and inline keyboard) of an existing message.
    ///
    /// # Errors
    /// Returns an error when the request or the Bot API call fails.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("message_id".to_string(), json!(message_id));
        body.insert("text".to_string(), json!(text));
        if let Some(markup) = reply_markup {
            body.insert("reply_markup".to_string(), serde_json::to_value(markup)?);
        }
        // The API returns either the edited message or `true`; neither is
        // needed by callers.
        let _: Value =
            self.call("editMessageText", &body, Duration::from_secs(CALL_TIMEOUT_SECS)).await?;
        Ok(())
    }

    /// Acknowledges a callback query so the client stops its spinner.
    ///
    /// # Errors
    /// Returns an error when the request or the Bot API call fails.
    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TelegramError> {
        let body = json!({ "callback_query_id": callback_id });
        let _: Value =
            self.call("answerCallbackQuery", &body, Duration::from_secs(CALL_TIMEOUT_SECS)).await?;
        Ok(())
    }

    /// Resolves a `file_id` to a downloadable path.
    ///
    /// # Errors
    /// Returns an error when the request or the Bot API call fails.
    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo, TelegramError> {
        let body = json!({ "file_id": file_id });
        self.call("getFile", &body, Duration::from_secs(CALL_TIMEOUT_SECS)).await
    }

    /// Downloads file content by the path returned from [`Self::get_file`].
    ///
    /// # Errors
    /// Returns an error when the request fails or the server responds with
    /// a non-success status.
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TelegramError> {
        let url = format!("{}/{file_path}", self.file_base);
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(CALL_TIMEOUT_SECS))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Api(format!("file download failed: HTTP {status}")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl From<serde_json::Error> for TelegramError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(format!("serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelopes_unwrap_to_the_result() {
        let body = r#"{"ok": true, "result": [{"update_id": 3}]}"#;
        let envelope: ApiResponse<Vec<Update>> = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(err) => panic!("envelope should parse: {err}"),
        };
        let updates = match envelope.into_result() {
            Ok(updates) => updates,
            Err(err) => panic!("envelope should be ok: {err}"),
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 3);
    }

    #[test]
    fn error_envelopes_carry_the_description() {
        let body = r#"{"ok": false, "description": "Bad Request: chat not found"}"#;
        let envelope: ApiResponse<Value> = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(err) => panic!("envelope should parse: {err}"),
        };
        match envelope.into_result() {
            Err(TelegramError::Api(description)) => {
                assert!(description.contains("chat not found"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn flood_control_maps_to_rate_limited() {
        let body = r#"{"ok": false, "description": "Too Many Requests", "parameters": {"retry_after": 17}}"#;
        let envelope: ApiResponse<Value> = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(err) => panic!("envelope should parse: {err}"),
        };
        match envelope.into_result() {
            Err(TelegramError::RateLimited { retry_after }) => assert_eq!(retry_after, 17),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }
}
