//! Bot API wire types
//!
//! Only the fields this bot reads or writes are modelled; serde ignores the
//! rest of each payload.

use crate::linking::SubjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's private chat shares the user's id
impl From<SubjectId> for ChatId {
    fn from(subject: SubjectId) -> Self {
        Self(subject.0)
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    pub fn subject_id(&self) -> SubjectId {
        SubjectId(self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Envelope around every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

// ============================================================================
// Outbound
// ============================================================================

/// A single inline button attached to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Opens a URL in the browser
    Url { label: String, url: String },
    /// Opens a Telegram web app (private chats only)
    WebApp { label: String, url: String },
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn web_app(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::WebApp {
            label: label.into(),
            url: url.into(),
        }
    }

    #[cfg(test)]
    pub fn target(&self) -> &str {
        match self {
            Self::Url { url, .. } | Self::WebApp { url, .. } => url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: ChatId,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

#[derive(Debug, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

impl From<Button> for InlineKeyboardMarkup {
    fn from(button: Button) -> Self {
        let button = match button {
            Button::Url { label, url } => InlineKeyboardButton {
                text: label,
                url: Some(url),
                web_app: None,
            },
            Button::WebApp { label, url } => InlineKeyboardButton {
                text: label,
                url: None,
                web_app: Some(WebAppInfo { url }),
            },
        };
        Self {
            inline_keyboard: vec![vec![button]],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SetMyCommandsRequest<'a> {
    pub commands: &'a [BotCommand],
}
