//! Outbound notifications about successful mutations.
//!
//! A [`Notifier`] only turns a message into an `HttpRequest`; the client
//! sends it with its own transport, so notifications follow the client's
//! execution mode. Delivery problems are logged by the client and never
//! reach the operation's outcome.
//!
//! Delivery is not detached: the message is sent after the mutation
//! succeeds and before the operation returns, so a slow or unresponsive
//! notification endpoint delays the caller's result by up to the client's
//! request timeout (`ClientConfig::timeout`, 15 s by default).

use std::fmt;

use serde::Serialize;

use crate::http::{HttpMethod, HttpRequest, CONTENT_TYPE_JSON};

pub const TELEGRAM_TOKEN_ENV: &str = "TRACKER_TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "TRACKER_TELEGRAM_CHAT_ID";
pub const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

pub trait Notifier: Send + Sync {
    /// Request announcing `text`, or `None` to stay silent.
    fn announce(&self, text: &str) -> Option<HttpRequest>;
}

/// Notifier for clients without a notification channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn announce(&self, _text: &str) -> Option<HttpRequest> {
        None
    }
}

/// Sends each message to one Telegram chat through the bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    base_url: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            base_url: TELEGRAM_BASE_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from `TRACKER_TELEGRAM_TOKEN` and `TRACKER_TELEGRAM_CHAT_ID`.
    /// `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var(TELEGRAM_TOKEN_ENV).ok()?;
        let chat_id = std::env::var(TELEGRAM_CHAT_ID_ENV).ok()?;
        if token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self::new(token, chat_id))
    }
}

impl Notifier for TelegramNotifier {
    fn announce(&self, text: &str) -> Option<HttpRequest> {
        let body = serde_json::to_string(&SendMessage {
            chat_id: &self.chat_id,
            text,
        })
        .ok()?;
        Some(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/bot{}/sendMessage", self.base_url, self.token),
            headers: vec![("content-type".to_string(), CONTENT_TYPE_JSON.to_string())],
            body: Some(body),
        })
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}
