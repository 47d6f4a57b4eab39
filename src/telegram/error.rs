//! Telegram error types

use std::time::Duration;
use thiserror::Error;

/// Bot API error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TelegramError {
    pub kind: TelegramErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl TelegramError {
    pub fn new(kind: TelegramErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Network, message)
    }

    #[cfg(test)]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Auth, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Unknown, message)
    }

    /// Classify an error reported by the Bot API (`error_code` mirrors the
    /// HTTP status).
    pub fn from_api(error_code: u16, description: &str, retry_after: Option<u64>) -> Self {
        let kind = match error_code {
            401 => TelegramErrorKind::Auth,
            403 => TelegramErrorKind::Forbidden,
            429 => TelegramErrorKind::RateLimit,
            400 | 404 | 409 => TelegramErrorKind::InvalidRequest,
            500..=599 => TelegramErrorKind::Server,
            _ => TelegramErrorKind::Unknown,
        };
        let err = Self::new(kind, format!("Telegram API error {error_code}: {description}"));
        match retry_after {
            Some(secs) => err.with_retry_after(Duration::from_secs(secs)),
            None => err,
        }
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the bot token
        let err = err.without_url();
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::network(err.to_string())
        } else {
            Self::unknown(err.to_string())
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramErrorKind {
    /// Network issues, timeouts - retryable
    Network,
    /// Flood control (429) - retryable after `retry_after`
    RateLimit,
    /// Server error (5xx) - retryable
    Server,
    /// The user blocked the bot or never opened a private chat (403)
    Forbidden,
    /// Bad bot token (401) - not retryable
    Auth,
    /// Malformed request (400, 404, 409) - not retryable
    InvalidRequest,
    Unknown,
}

impl TelegramErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::Server)
    }
}
