//! Points ledger
//!
//! Balances are keyed by subject. The in-memory ledger stands in until a
//! persistent backend exists; anything implementing [`PointsLedger`] can
//! replace it without touching the bot.

use crate::linking::SubjectId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)] // Raised by remote ledgers
pub enum LedgerError {
    #[error("Points ledger unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Credit `amount` points and return the new balance
    async fn award_points(&self, subject: SubjectId, amount: u64) -> Result<u64, LedgerError>;

    /// Current balance; zero for subjects never credited
    async fn get_balance(&self, subject: SubjectId) -> Result<u64, LedgerError>;
}

#[async_trait]
impl<T: PointsLedger + ?Sized> PointsLedger for Arc<T> {
    async fn award_points(&self, subject: SubjectId, amount: u64) -> Result<u64, LedgerError> {
        (**self).award_points(subject, amount).await
    }

    async fn get_balance(&self, subject: SubjectId) -> Result<u64, LedgerError> {
        (**self).get_balance(subject).await
    }
}

/// Process-local balances, lost on restart
#[derive(Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<SubjectId, u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointsLedger for MemoryLedger {
    async fn award_points(&self, subject: SubjectId, amount: u64) -> Result<u64, LedgerError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(subject).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    async fn get_balance(&self, subject: SubjectId) -> Result<u64, LedgerError> {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(balances.get(&subject).copied().unwrap_or(0))
    }
}
