//! Mock implementations for testing
//!
//! These mocks enable exercising the bot and the callback API without a
//! network or wall-clock time.

use crate::linking::{Clock, SubjectId};
use crate::points::{LedgerError, PointsLedger};
use crate::telegram::{
    Button, Chat, ChatId, ChatKind, Message, Messenger, TelegramError, TelegramErrorKind, Update,
    UpdateSource, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

// ============================================================================
// Mock Clock
// ============================================================================

/// Clock that only moves when told to
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Mock Messenger
// ============================================================================

/// A message the bot tried to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub button: Option<Button>,
}

/// Messenger that records every send. Chats registered with `fail` answer
/// with an error of the given kind instead.
#[derive(Default)]
pub struct MockMessenger {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<Vec<(ChatId, TelegramErrorKind)>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer sends to `chat` with a 403, like a user who never opened a
    /// private chat with the bot
    pub fn refuse(&self, chat: ChatId) {
        self.fail(chat, TelegramErrorKind::Forbidden);
    }

    pub fn fail(&self, chat: ChatId, kind: TelegramErrorKind) {
        self.failing.lock().unwrap().push((chat, kind));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.chat == chat).collect()
    }

    fn record(&self, chat: ChatId, text: &str, button: Option<Button>) -> Result<(), TelegramError> {
        let failure = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| *c == chat)
            .map(|(_, kind)| *kind);
        if let Some(kind) = failure {
            return Err(TelegramError::new(kind, format!("send to {chat} failed")));
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat,
            text: text.to_string(),
            button,
        });
        Ok(())
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        self.record(chat, text, None)
    }

    async fn send_button(
        &self,
        chat: ChatId,
        text: &str,
        button: Button,
    ) -> Result<(), TelegramError> {
        self.record(chat, text, Some(button))
    }
}

// ============================================================================
// Mock Update Source
// ============================================================================

/// Update source that serves queued batches, then parks until cancelled
#[derive(Default)]
pub struct MockUpdateSource {
    batches: Mutex<VecDeque<Result<Vec<Update>, TelegramError>>>,
    /// Offsets passed to each poll
    pub offsets: Mutex<Vec<Option<i64>>>,
    /// Notified when the queue runs dry
    pub drained: Notify,
}

impl MockUpdateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, batch: Vec<Update>) {
        self.batches.lock().unwrap().push_back(Ok(batch));
    }

    pub fn queue_error(&self, error: TelegramError) {
        self.batches.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateSource for MockUpdateSource {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout: std::time::Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        if let Some(batch) = next {
            return batch;
        }
        self.drained.notify_waiters();
        std::future::pending().await
    }
}

// ============================================================================
// Ledger that is always down
// ============================================================================

pub struct UnavailableLedger;

#[async_trait]
impl PointsLedger for UnavailableLedger {
    async fn award_points(&self, _subject: SubjectId, _amount: u64) -> Result<u64, LedgerError> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }

    async fn get_balance(&self, _subject: SubjectId) -> Result<u64, LedgerError> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }
}

// ============================================================================
// Update builders
// ============================================================================

pub const GROUP_CHAT: ChatId = ChatId(-100_200);

/// Text message from `user` in `chat`
pub fn text_update(update_id: i64, chat: ChatId, kind: ChatKind, user: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            from: Some(User {
                id: user,
                is_bot: false,
                username: None,
            }),
            chat: Chat { id: chat, kind },
            text: Some(text.to_string()),
        }),
    }
}

pub fn group_text(update_id: i64, user: i64, text: &str) -> Update {
    text_update(update_id, GROUP_CHAT, ChatKind::Supergroup, user, text)
}

pub fn private_text(update_id: i64, user: i64, text: &str) -> Update {
    text_update(update_id, ChatId(user), ChatKind::Private, user, text)
}
