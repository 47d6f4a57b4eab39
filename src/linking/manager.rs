//! Link session manager
//!
//! A token moves from `Issued` to exactly one terminal state: `Consumed`
//! (redeemed by the linking website), `Expired` (older than the TTL, either
//! swept or rejected at consume time) or `Invalidated` (explicitly
//! withdrawn). Linked status is tracked separately, so the redemption can
//! happen on a different channel than the one that issued the token.
//!
//! Nothing here logs; callers decide what to report.

use super::clock::Clock;
use super::store::LinkStore;
use super::token::{LinkToken, SubjectId};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Missing, already consumed, expired or invalidated. These cases are
    /// deliberately not distinguished.
    #[error("Link token not found")]
    TokenNotFound,
}

pub struct LinkSessionManager {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    link_endpoint: String,
}

impl LinkSessionManager {
    pub fn new(
        store: Arc<dyn LinkStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        link_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            link_endpoint: link_endpoint.into(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new token for `subject`, sweeping expired tokens first.
    pub fn issue_token(&self, subject: SubjectId) -> LinkToken {
        let now = self.clock.now();
        self.sweep_expired(now);

        let token = LinkToken::generate(subject, now);
        self.store.insert_token(token.clone());
        token
    }

    /// Remove every token older than the TTL at `now`. Returns the count
    /// removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        self.store.sweep_tokens(now - self.ttl)
    }

    /// Sweep against the injected clock
    pub fn sweep_expired_now(&self) -> usize {
        self.sweep_expired(self.clock.now())
    }

    /// Redeem a token, returning the subject it was issued to.
    ///
    /// Expiry is re-checked here, so a token past its TTL is rejected even
    /// if no sweep has run yet.
    pub fn consume(&self, value: &str) -> Result<SubjectId, LinkError> {
        let token = self.store.take_token(value).ok_or(LinkError::TokenNotFound)?;
        if self.is_expired(&token, self.clock.now()) {
            return Err(LinkError::TokenNotFound);
        }
        Ok(token.subject_id)
    }

    /// Withdraw a token without redeeming it. Returns whether a live token
    /// was removed.
    pub fn invalidate(&self, value: &str) -> bool {
        self.store
            .take_token(value)
            .is_some_and(|token| !self.is_expired(&token, self.clock.now()))
    }

    /// Idempotently mark `subject` as linked
    pub fn mark_linked(&self, subject: SubjectId) {
        self.store.add_linked(subject);
    }

    pub fn is_linked(&self, subject: SubjectId) -> bool {
        self.store.is_linked(subject)
    }

    pub fn live_tokens(&self) -> usize {
        self.store.live_tokens()
    }

    /// `<link_endpoint>?token=<value>`
    pub fn link_url(&self, token: &LinkToken) -> String {
        let separator = if self.link_endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}token={}", self.link_endpoint, token.value)
    }

    fn is_expired(&self, token: &LinkToken, now: DateTime<Utc>) -> bool {
        now - token.issued_at > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linking::store::MemoryLinkStore;
    use crate::testing::MockClock;

    fn manager(ttl_secs: i64) -> (LinkSessionManager, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new());
        let manager = LinkSessionManager::new(
            Arc::new(MemoryLinkStore::new()),
            clock.clone(),
            Duration::seconds(ttl_secs),
            "https://example.com/link",
        );
        (manager, clock)
    }

    #[test]
    fn test_issue_then_consume_returns_subject_once() {
        let (links, _clock) = manager(300);

        let token = links.issue_token(SubjectId(42));
        assert_eq!(links.consume(&token.value), Ok(SubjectId(42)));
        assert_eq!(links.consume(&token.value), Err(LinkError::TokenNotFound));
    }

    #[test]
    fn test_consume_after_ttl_fails_without_sweep() {
        let (links, clock) = manager(300);

        let token = links.issue_token(SubjectId(7));
        clock.advance(Duration::seconds(301));

        assert_eq!(links.consume(&token.value), Err(LinkError::TokenNotFound));
    }

    #[test]
    fn test_token_is_valid_at_exactly_ttl() {
        let (links, clock) = manager(300);

        let token = links.issue_token(SubjectId(7));
        clock.advance(Duration::seconds(300));

        assert_eq!(links.consume(&token.value), Ok(SubjectId(7)));
    }

    #[test]
    fn test_unknown_token_not_found() {
        let (links, _clock) = manager(300);
        assert_eq!(links.consume("never-issued"), Err(LinkError::TokenNotFound));
    }

    #[test]
    fn test_mark_linked_is_idempotent() {
        let (links, _clock) = manager(300);

        assert!(!links.is_linked(SubjectId(99)));
        links.mark_linked(SubjectId(99));
        assert!(links.is_linked(SubjectId(99)));
        links.mark_linked(SubjectId(99));
        assert!(links.is_linked(SubjectId(99)));
    }

    #[test]
    fn test_consume_does_not_link() {
        let (links, _clock) = manager(300);

        let token = links.issue_token(SubjectId(3));
        links.consume(&token.value).unwrap();
        assert!(!links.is_linked(SubjectId(3)));
    }

    #[test]
    fn test_subject_may_hold_several_tokens() {
        let (links, _clock) = manager(300);

        let first = links.issue_token(SubjectId(5));
        let second = links.issue_token(SubjectId(5));
        assert_ne!(first.value, second.value);

        assert_eq!(links.consume(&second.value), Ok(SubjectId(5)));
        assert_eq!(links.consume(&first.value), Ok(SubjectId(5)));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (links, clock) = manager(300);

        let old = links.issue_token(SubjectId(1));
        clock.advance(Duration::seconds(200));
        let young = links.issue_token(SubjectId(2));
        clock.advance(Duration::seconds(150));

        assert_eq!(links.sweep_expired_now(), 1);
        assert_eq!(links.live_tokens(), 1);
        assert_eq!(links.consume(&old.value), Err(LinkError::TokenNotFound));
        assert_eq!(links.consume(&young.value), Ok(SubjectId(2)));
    }

    #[test]
    fn test_issue_sweeps_expired_tokens() {
        let (links, clock) = manager(60);

        links.issue_token(SubjectId(1));
        links.issue_token(SubjectId(2));
        clock.advance(Duration::seconds(61));
        links.issue_token(SubjectId(3));

        assert_eq!(links.live_tokens(), 1);
    }

    #[test]
    fn test_invalidated_token_cannot_be_consumed() {
        let (links, _clock) = manager(300);

        let token = links.issue_token(SubjectId(8));
        assert!(links.invalidate(&token.value));
        assert!(!links.invalidate(&token.value));
        assert_eq!(links.consume(&token.value), Err(LinkError::TokenNotFound));
    }

    #[test]
    fn test_invalidate_expired_token_reports_false() {
        let (links, clock) = manager(10);

        let token = links.issue_token(SubjectId(8));
        clock.advance(Duration::seconds(11));
        assert!(!links.invalidate(&token.value));
        assert_eq!(links.live_tokens(), 0);
    }

    #[test]
    fn test_link_url_appends_token_query() {
        let (links, _clock) = manager(300);
        let token = links.issue_token(SubjectId(1));

        assert_eq!(
            links.link_url(&token),
            format!("https://example.com/link?token={}", token.value)
        );
    }

    #[test]
    fn test_link_url_extends_existing_query() {
        let links = LinkSessionManager::new(
            Arc::new(MemoryLinkStore::new()),
            Arc::new(MockClock::new()),
            Duration::seconds(300),
            "https://example.com/link?src=bot",
        );
        let token = links.issue_token(SubjectId(1));

        assert_eq!(
            links.link_url(&token),
            format!("https://example.com/link?src=bot&token={}", token.value)
        );
    }

    #[test]
    fn test_concurrent_issuance_yields_distinct_tokens() {
        let (links, _clock) = manager(300);
        let links = Arc::new(links);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let links = Arc::clone(&links);
                std::thread::spawn(move || (i, links.issue_token(SubjectId(i))))
            })
            .collect();
        let issued: Vec<(i64, LinkToken)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let distinct: std::collections::HashSet<_> =
            issued.iter().map(|(_, t)| t.value.clone()).collect();
        assert_eq!(distinct.len(), 64);

        for (subject, token) in issued {
            assert_eq!(links.consume(&token.value), Ok(SubjectId(subject)));
        }
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        let (links, _clock) = manager(300);
        let links = Arc::new(links);
        let token = links.issue_token(SubjectId(11));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let links = Arc::clone(&links);
                let value = token.value.clone();
                std::thread::spawn(move || links.consume(&value))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(winners, 1);
    }
}
