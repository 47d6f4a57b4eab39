//! Routes inbound updates to the linking, balance and scoring paths

use super::command::{help_text, parse_command, Command};
use super::UpdateHandler;
use crate::classifier::HelpfulnessClassifier;
use crate::linking::{LinkSessionManager, SubjectId};
use crate::points::PointsLedger;
use crate::telegram::{
    Button, Chat, ChatId, ChatKind, Messenger, TelegramError, TelegramErrorKind, Update,
};
use async_trait::async_trait;
use std::sync::Arc;

const LINK_BUTTON_LABEL: &str = "Link account";
const WEBAPP_BUTTON_LABEL: &str = "Open web app";
const CHECK_DMS: &str = "I've sent you a private message with your linking link.";
const DM_REFUSED: &str = "I couldn't message you privately. Open a chat with me, press Start, \
                          then send /link_account there.";
const DM_FAILED: &str = "I couldn't send you the linking link just now. Please try /link_account again.";
const NOT_LINKED: &str = "Your account isn't linked yet. Send /link_account to get started.";
const LINKED: &str = "Your account is linked.";
const BALANCE_UNAVAILABLE: &str = "I can't fetch your balance right now. Please try again later.";
const WEBAPP_UNCONFIGURED: &str = "The web app isn't available.";
const DEBUG_LINKED: &str = "Debug: your account is now marked as linked.";

/// Behaviour switches for the dispatcher
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub points_per_helpful: u64,
    /// Only ever true in debug builds
    pub debug_commands: bool,
    pub webapp_url: Option<String>,
    /// The bot's own username, for `/command@username` addressing
    pub bot_username: Option<String>,
}

/// What handling an update amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do (no text, sent by a bot, foreign command, ...)
    Ignored,
    /// A command was answered
    Replied,
    /// A link button reached the subject's private chat
    LinkSent,
    /// The link couldn't reach the subject's private chat; the token was withdrawn
    LinkUndeliverable,
    NotHelpful,
    /// Helpful, but the sender hasn't linked an account
    HelpfulUnlinked,
    Awarded { balance: u64 },
    /// Helpful and linked, but the ledger rejected the award
    AwardFailed,
}

pub struct Dispatcher<M, P, H> {
    links: Arc<LinkSessionManager>,
    messenger: M,
    ledger: P,
    classifier: H,
    config: DispatcherConfig,
}

impl<M, P, H> Dispatcher<M, P, H>
where
    M: Messenger,
    P: PointsLedger,
    H: HelpfulnessClassifier,
{
    pub fn new(
        links: Arc<LinkSessionManager>,
        messenger: M,
        ledger: P,
        classifier: H,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            links,
            messenger,
            ledger,
            classifier,
            config,
        }
    }

    /// Handle one update.
    ///
    /// Errors are delivery failures that no fallback covered.
    pub async fn dispatch(&self, update: &Update) -> Result<Outcome, TelegramError> {
        let Some(message) = &update.message else {
            return Ok(Outcome::Ignored);
        };
        let Some(from) = message.from.as_ref().filter(|u| !u.is_bot) else {
            return Ok(Outcome::Ignored);
        };
        let Some(text) = message.text.as_deref() else {
            return Ok(Outcome::Ignored);
        };
        let subject = from.subject_id();

        match parse_command(text, self.config.bot_username.as_deref()) {
            Some(command) => self.handle_command(command, &message.chat, subject).await,
            None if message.chat.kind.is_group() => self.score_message(text, subject).await,
            None => Ok(Outcome::Ignored),
        }
    }

    async fn handle_command(
        &self,
        command: Command,
        chat: &Chat,
        subject: SubjectId,
    ) -> Result<Outcome, TelegramError> {
        match command {
            Command::Start | Command::Help => self.reply_help(chat.id).await,
            Command::LinkAccount => self.issue_link(chat.id, subject).await,
            Command::LinkStatus => {
                let text = if self.links.is_linked(subject) {
                    LINKED
                } else {
                    NOT_LINKED
                };
                self.messenger.send_text(chat.id, text).await?;
                Ok(Outcome::Replied)
            }
            Command::Balance => self.reply_balance(chat.id, subject).await,
            Command::WebApp => self.reply_webapp(chat, subject).await,
            Command::DebugLink if self.config.debug_commands => {
                tracing::warn!(subject_id = %subject, "Debug command bypassed the linking flow");
                self.links.mark_linked(subject);
                self.messenger.send_text(chat.id, DEBUG_LINKED).await?;
                Ok(Outcome::Replied)
            }
            Command::DebugLink | Command::Unknown => {
                if chat.kind == ChatKind::Private {
                    self.reply_help(chat.id).await
                } else {
                    Ok(Outcome::Ignored)
                }
            }
            Command::OtherBot => Ok(Outcome::Ignored),
        }
    }

    async fn reply_help(&self, chat: ChatId) -> Result<Outcome, TelegramError> {
        self.messenger
            .send_text(chat, &help_text(self.config.debug_commands))
            .await?;
        Ok(Outcome::Replied)
    }

    /// Issue a token and hand the link URL to the subject privately.
    ///
    /// The URL is a capability, so it only ever goes to the subject's own
    /// chat. If delivery fails the token is withdrawn at once and the chat
    /// the command came from is told what to do instead.
    async fn issue_link(&self, chat: ChatId, subject: SubjectId) -> Result<Outcome, TelegramError> {
        let token = self.links.issue_token(subject);
        let url = self.links.link_url(&token);
        let dm = ChatId::from(subject);
        let text = format!(
            "Open this link to connect your account. It works once and expires in {}.",
            expiry_phrase(self.links.ttl())
        );

        match self
            .messenger
            .send_button(dm, &text, Button::url(LINK_BUTTON_LABEL, url))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    subject_id = %subject,
                    chat_id = %chat,
                    token_fingerprint = %token.fingerprint(),
                    "Link token issued"
                );
                if chat != dm {
                    self.messenger.send_text(chat, CHECK_DMS).await?;
                }
                Ok(Outcome::LinkSent)
            }
            Err(e) => {
                self.links.invalidate(&token.value);
                tracing::info!(
                    subject_id = %subject,
                    chat_id = %chat,
                    token_fingerprint = %token.fingerprint(),
                    error = %e,
                    kind = ?e.kind,
                    "Link not delivered, token withdrawn"
                );

                // 403 and "chat not found" both mean the subject never
                // started a private chat with the bot
                let fallback = match e.kind {
                    TelegramErrorKind::Forbidden | TelegramErrorKind::InvalidRequest => DM_REFUSED,
                    _ => DM_FAILED,
                };
                if chat != dm {
                    self.messenger.send_text(chat, fallback).await?;
                }
                Ok(Outcome::LinkUndeliverable)
            }
        }
    }

    async fn reply_balance(&self, chat: ChatId, subject: SubjectId) -> Result<Outcome, TelegramError> {
        if !self.links.is_linked(subject) {
            self.messenger.send_text(chat, NOT_LINKED).await?;
            return Ok(Outcome::Replied);
        }

        let text = match self.ledger.get_balance(subject).await {
            Ok(balance) => format!("You have {balance} points."),
            Err(e) => {
                tracing::warn!(subject_id = %subject, error = %e, "Balance lookup failed");
                BALANCE_UNAVAILABLE.to_string()
            }
        };
        self.messenger.send_text(chat, &text).await?;
        Ok(Outcome::Replied)
    }

    async fn reply_webapp(&self, chat: &Chat, subject: SubjectId) -> Result<Outcome, TelegramError> {
        if !self.links.is_linked(subject) {
            self.messenger.send_text(chat.id, NOT_LINKED).await?;
            return Ok(Outcome::Replied);
        }
        let Some(url) = self.config.webapp_url.as_deref() else {
            self.messenger.send_text(chat.id, WEBAPP_UNCONFIGURED).await?;
            return Ok(Outcome::Replied);
        };

        // Web-app buttons only work in private chats
        let button = if chat.kind == ChatKind::Private {
            Button::web_app(WEBAPP_BUTTON_LABEL, url)
        } else {
            Button::url(WEBAPP_BUTTON_LABEL, url)
        };
        self.messenger
            .send_button(chat.id, "Open the web app:", button)
            .await?;
        Ok(Outcome::Replied)
    }

    async fn score_message(&self, text: &str, subject: SubjectId) -> Result<Outcome, TelegramError> {
        if !self.classifier.classify(text).await {
            return Ok(Outcome::NotHelpful);
        }
        if !self.links.is_linked(subject) {
            tracing::debug!(subject_id = %subject, "Helpful message from unlinked subject");
            return Ok(Outcome::HelpfulUnlinked);
        }

        match self
            .ledger
            .award_points(subject, self.config.points_per_helpful)
            .await
        {
            Ok(balance) => {
                tracing::info!(
                    subject_id = %subject,
                    awarded = self.config.points_per_helpful,
                    balance,
                    "Points awarded"
                );
                Ok(Outcome::Awarded { balance })
            }
            Err(e) => {
                tracing::warn!(subject_id = %subject, error = %e, "Awarding points failed");
                Ok(Outcome::AwardFailed)
            }
        }
    }
}

/// "5 minutes", "1 minute", "90 seconds"
fn expiry_phrase(ttl: chrono::Duration) -> String {
    let secs = ttl.num_seconds().max(1);
    let (count, unit) = if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[async_trait]
impl<M, P, H> UpdateHandler for Dispatcher<M, P, H>
where
    M: Messenger,
    P: PointsLedger,
    H: HelpfulnessClassifier,
{
    async fn handle_update(&self, update: &Update) {
        match self.dispatch(update).await {
            Ok(outcome) => {
                tracing::debug!(update_id = update.update_id, ?outcome, "Update handled");
            }
            Err(e) => {
                tracing::warn!(
                    update_id = update.update_id,
                    error = %e,
                    kind = ?e.kind,
                    "Reply delivery failed"
                );
            }
        }
    }
}
