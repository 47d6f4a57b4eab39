//! Storage for live link tokens and linked subjects

use super::token::{LinkToken, SubjectId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store behind the link session manager.
///
/// `take_token` is a compare-and-remove: for any token value at most one
/// caller ever receives the entry back. A shared key-value store with
/// native per-key expiry can implement this trait in place of
/// [`MemoryLinkStore`].
pub trait LinkStore: Send + Sync {
    /// Record a freshly issued token
    fn insert_token(&self, token: LinkToken);

    /// Remove a token and hand it back, if it is still present
    fn take_token(&self, value: &str) -> Option<LinkToken>;

    /// Remove every token issued strictly before `cutoff`.
    /// Returns the number removed.
    fn sweep_tokens(&self, cutoff: DateTime<Utc>) -> usize;

    /// Number of tokens currently held
    fn live_tokens(&self) -> usize;

    /// Add a subject to the linked set. Returns `true` if it was newly added.
    fn add_linked(&self, subject: SubjectId) -> bool;

    /// Whether a subject is in the linked set
    fn is_linked(&self, subject: SubjectId) -> bool;
}

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, LinkToken>,
    linked: HashSet<SubjectId>,
}

/// In-process store. Both maps sit behind one mutex so every mutation is
/// serialized against every other.
#[derive(Default)]
pub struct MemoryLinkStore {
    inner: Mutex<Inner>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing here can leave the maps half-updated, so a poisoned lock
        // still guards consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkStore for MemoryLinkStore {
    fn insert_token(&self, token: LinkToken) {
        self.lock().tokens.insert(token.value.clone(), token);
    }

    fn take_token(&self, value: &str) -> Option<LinkToken> {
        self.lock().tokens.remove(value)
    }

    fn sweep_tokens(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.lock();
        let before = inner.tokens.len();
        inner.tokens.retain(|_, token| token.issued_at >= cutoff);
        before - inner.tokens.len()
    }

    fn live_tokens(&self) -> usize {
        self.lock().tokens.len()
    }

    fn add_linked(&self, subject: SubjectId) -> bool {
        self.lock().linked.insert(subject)
    }

    fn is_linked(&self, subject: SubjectId) -> bool {
        self.lock().linked.contains(&subject)
    }
}
