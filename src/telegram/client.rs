//! Bot API client over HTTPS

use super::types::{
    ApiResponse, BotCommand, Button, ChatId, GetUpdatesRequest, InlineKeyboardMarkup,
    SendMessageRequest, SetMyCommandsRequest, Update, User,
};
use super::{Messenger, TelegramError, UpdateSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Slack on top of the long-poll timeout before the HTTP request gives up
const REQUEST_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// `<api_url>/bot<token>`; never logged
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(poll_timeout.saturating_add(REQUEST_GRACE))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    /// Identify the bot behind the configured token
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Replace the command menu shown by Telegram clients
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let _: bool = self
            .call("setMyCommands", &SetMyCommandsRequest { commands })
            .await?;
        Ok(())
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode_response(status.as_u16(), &body)
    }
}

/// Unwrap the `{ ok, result, ... }` envelope, classifying failures.
///
/// The Bot API answers errors with a JSON envelope too, so the body is
/// parsed before looking at the status.
fn decode_response<R: DeserializeOwned>(status: u16, body: &str) -> Result<R, TelegramError> {
    let Ok(envelope) = serde_json::from_str::<ApiResponse<R>>(body) else {
        return Err(TelegramError::from_api(
            status,
            "unparseable response body",
            None,
        ));
    };

    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| TelegramError::unknown("Response marked ok without a result"));
    }

    Err(TelegramError::from_api(
        envelope.error_code.unwrap_or(status),
        envelope.description.as_deref().unwrap_or("no description"),
        envelope.parameters.and_then(|p| p.retry_after),
    ))
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: chat,
                    text,
                    reply_markup: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_button(
        &self,
        chat: ChatId,
        text: &str,
        button: Button,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: chat,
                    text,
                    reply_markup: Some(InlineKeyboardMarkup::from(button)),
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: &["message"],
            },
        )
        .await
    }
}
