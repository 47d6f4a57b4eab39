//! Long-polling update loop

use super::UpdateHandler;
use crate::telegram::{ChatId, TelegramError, TelegramErrorKind, Update, UpdateSource};
use futures::future::join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Pulls updates and feeds them to a handler until cancelled.
///
/// Updates from one chat are handled in arrival order; separate chats in a
/// batch are handled concurrently.
pub struct Poller<S, D> {
    source: S,
    handler: D,
    poll_timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl<S: UpdateSource, D: UpdateHandler> Poller<S, D> {
    pub fn new(source: S, handler: D, poll_timeout: Duration) -> Self {
        Self {
            source,
            handler,
            poll_timeout,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    #[cfg(test)]
    fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Poll until `cancel` fires.
    ///
    /// Only an authentication failure ends the loop early. Retryable errors
    /// back off exponentially, honouring the server's `retry_after`; other
    /// errors wait the maximum backoff before polling again.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TelegramError> {
        let mut offset: Option<i64> = None;
        let mut backoff = self.initial_backoff;

        tracing::info!(poll_timeout_secs = self.poll_timeout.as_secs(), "Update poller started");

        loop {
            let result = tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                result = self.source.get_updates(offset, self.poll_timeout) => result,
            };

            match result {
                Ok(updates) => {
                    backoff = self.initial_backoff;
                    if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                        offset = Some(last + 1);
                    }
                    if !updates.is_empty() {
                        tracing::debug!(count = updates.len(), "Received updates");
                        self.handle_batch(&updates).await;
                    }
                }
                Err(e) if e.kind == TelegramErrorKind::Auth => {
                    tracing::error!(error = %e, "Bot token rejected, stopping poller");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry_delay(&e, backoff);
                    tracing::warn!(
                        error = %e,
                        kind = ?e.kind,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Polling failed, backing off"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }

        tracing::info!("Update poller stopped");
        Ok(())
    }

    fn retry_delay(&self, error: &TelegramError, backoff: Duration) -> Duration {
        if error.kind.is_retryable() {
            error.retry_after.unwrap_or(backoff)
        } else {
            // e.g. 409 while another instance is polling; won't clear quickly
            self.max_backoff
        }
    }

    async fn handle_batch(&self, updates: &[Update]) {
        let mut by_chat: Vec<(Option<ChatId>, Vec<&Update>)> = Vec::new();
        for update in updates {
            let chat = update.message.as_ref().map(|m| m.chat.id);
            match by_chat.iter_mut().find(|(c, _)| *c == chat) {
                Some((_, group)) => group.push(update),
                None => by_chat.push((chat, vec![update])),
            }
        }

        join_all(by_chat.into_iter().map(|(_, group)| async move {
            for update in group {
                self.handler.handle_update(update).await;
            }
        }))
        .await;
    }
}
