//! Telegram messaging gateway
//!
//! Inbound updates arrive by long polling; replies go out through
//! `sendMessage`. Both directions sit behind traits so the bot logic can be
//! exercised without a network.

mod client;
mod error;
mod types;

pub use client::TelegramClient;
pub use error::{TelegramError, TelegramErrorKind};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Outbound replies
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send plain text to a chat
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError>;

    /// Send text with a single inline button underneath
    async fn send_button(&self, chat: ChatId, text: &str, button: Button)
        -> Result<(), TelegramError>;
}

/// Inbound updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Long-poll for updates with `update_id >= offset`
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        (**self).send_text(chat, text).await
    }

    async fn send_button(
        &self,
        chat: ChatId,
        text: &str,
        button: Button,
    ) -> Result<(), TelegramError> {
        (**self).send_button(chat, text, button).await
    }
}

#[async_trait]
impl<T: UpdateSource + ?Sized> UpdateSource for Arc<T> {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        (**self).get_updates(offset, timeout).await
    }
}
