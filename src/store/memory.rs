//! In-process reference stores.
//!
//! Useful for tests and single-node deployments; production hosts swap in a
//! cache- or database-backed implementation of the same traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::{BalanceStore, CounterStore, LedgerEntry, RateWindow, StoreResult};

/// Counter store backed by a [`DashMap`]. Per-key atomicity comes from the
/// map's shard locks: the compare step and the swap happen under one entry
/// lock, so two racing writers can never both succeed against the same
/// expected value.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    windows: Arc<DashMap<String, RateWindow>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<RateWindow>> {
        Ok(self.windows.get(key).map(|w| w.clone()))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&RateWindow>,
        new: RateWindow,
    ) -> StoreResult<bool> {
        match self.windows.entry(key.to_string()) {
            dashmap::Entry::Occupied(mut entry) => match expected {
                Some(expected) if entry.get() == expected => {
                    entry.insert(new);
                    Ok(true)
                }
                _ => Ok(false),
            },
            dashmap::Entry::Vacant(entry) => {
                if expected.is_none() {
                    entry.insert(new);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Account {
    balance: Decimal,
    ledger: Vec<LedgerEntry>,
}

/// Balance store backed by a [`DashMap`]. The check-and-debit runs under the
/// account's entry lock, which is the transactional boundary a real
/// implementation would get from a row lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryBalanceStore {
    accounts: Arc<DashMap<String, Account>>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance, e.g. in test setup.
    pub fn with_balance(self, user_id: impl Into<String>, balance: Decimal) -> Self {
        self.accounts.insert(
            user_id.into(),
            Account {
                balance,
                ledger: Vec::new(),
            },
        );
        self
    }

    /// Ledger entries recorded for `user_id`, oldest first.
    pub fn ledger(&self, user_id: &str) -> Vec<LedgerEntry> {
        self.accounts
            .get(user_id)
            .map(|a| a.ledger.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn balance(&self, user_id: &str) -> StoreResult<Decimal> {
        Ok(self
            .accounts
            .get(user_id)
            .map(|a| a.balance)
            .unwrap_or_default())
    }

    async fn try_debit(&self, user_id: &str, amount: Decimal, reason: &str) -> StoreResult<bool> {
        let mut account = self.accounts.entry(user_id.to_string()).or_default();
        if account.balance < amount {
            return Ok(false);
        }
        account.balance -= amount;
        account.ledger.push(LedgerEntry {
            user_id: user_id.to_string(),
            delta: -amount,
            reason: reason.to_string(),
            at: Utc::now(),
        });
        Ok(true)
    }

    async fn credit(&self, user_id: &str, amount: Decimal, reason: &str) -> StoreResult<()> {
        let mut account = self.accounts.entry(user_id.to_string()).or_default();
        account.balance += amount;
        account.ledger.push(LedgerEntry {
            user_id: user_id.to_string(),
            delta: amount,
            reason: reason.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    use super::*;

    #[tokio::test]
    async fn test_counter_cas_detects_stale_expected() {
        let store = MemoryCounterStore::new();
        let now = Utc::now();
        let first = RateWindow::opened_at(now, Duration::seconds(60));

        assert!(store.compare_and_swap("k", None, first.clone()).await.unwrap());

        // A swap against "no record" must now fail.
        let other = RateWindow::opened_at(now, Duration::seconds(60));
        assert!(!store.compare_and_swap("k", None, other).await.unwrap());

        // A swap against the stored value succeeds.
        let mut bumped = first.clone();
        bumped.count = 2;
        assert!(store.compare_and_swap("k", Some(&first), bumped).await.unwrap());
    }

    #[tokio::test]
    async fn test_debit_refuses_overdraft() {
        let store = MemoryBalanceStore::new().with_balance("u1", dec!(10));

        assert!(!store.try_debit("u1", dec!(12), "gig").await.unwrap());
        assert_eq!(store.balance("u1").await.unwrap(), dec!(10));
        assert!(store.ledger("u1").is_empty());

        assert!(store.try_debit("u1", dec!(4), "gig").await.unwrap());
        assert_eq!(store.balance("u1").await.unwrap(), dec!(6));
        assert_eq!(store.ledger("u1").len(), 1);
        assert_eq!(store.ledger("u1")[0].delta, dec!(-4));
    }

    #[tokio::test]
    async fn test_unknown_user_has_zero_balance() {
        let store = MemoryBalanceStore::new();
        assert_eq!(store.balance("nobody").await.unwrap(), Decimal::ZERO);
        assert!(!store.try_debit("nobody", dec!(1), "gig").await.unwrap());
    }
}
