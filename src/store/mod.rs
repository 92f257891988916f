//! Counter and balance store collaborators.
//!
//! The policy layer owns no durable state: counters and credit balances live
//! behind these traits (a cache row, a database table, or the in-memory
//! reference stores). The store is the sole serialization point for mutations,
//! so both traits expose atomic primitives rather than read/write pairs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

mod memory;

pub use memory::{MemoryBalanceStore, MemoryCounterStore};

/// Errors surfaced by a store collaborator.
///
/// A store failure is never an implicit "allow": callers fail closed and
/// surface the error to the hosting request layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is unreachable or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A fixed-window counter record, keyed by caller identity.
///
/// Created lazily on the first hit for a key. The count resets to zero and
/// `started_at` moves forward whenever a full window has elapsed; stale
/// records simply get reset on their next hit, so nothing ever deletes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub started_at: DateTime<Utc>,
    pub window: Duration,
}

impl RateWindow {
    /// A fresh window opened at `now` with a single recorded hit.
    pub fn opened_at(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            started_at: now,
            window,
        }
    }

    /// Whether the window has fully elapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at >= self.window
    }

    /// Time remaining until the window resets. Zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.window - (now - self.started_at)).max(Duration::zero())
    }
}

/// Shared counter store for fixed-window throttling.
///
/// Keys are independent: no cross-key ordering is required, and independent
/// keys may be updated fully in parallel.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the current window for `key`, if one exists.
    async fn get(&self, key: &str) -> StoreResult<Option<RateWindow>>;

    /// Atomically replace the window for `key`, but only if the stored value
    /// still equals `expected` (`None` meaning "no record yet"). Returns
    /// `false` when another writer got there first; the caller re-reads and
    /// retries its decision against the fresh state.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&RateWindow>,
        new: RateWindow,
    ) -> StoreResult<bool>;
}

/// One credit movement, recorded alongside every balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: String,
    /// Negative for debits, positive for credits.
    pub delta: Decimal,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Credit balance store.
///
/// The policy layer requests debits; it never computes balances itself.
/// Implementations must make `try_debit` transactional per user so that
/// concurrent debits can never drive a balance negative.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Current balance for `user_id`. Unknown users have a zero balance.
    async fn balance(&self, user_id: &str) -> StoreResult<Decimal>;

    /// Atomically debit `amount` if the balance covers it, appending a ledger
    /// entry. Returns `false` (no mutation at all) when it does not.
    async fn try_debit(&self, user_id: &str, amount: Decimal, reason: &str) -> StoreResult<bool>;

    /// Credit `amount` to `user_id`, appending a ledger entry.
    async fn credit(&self, user_id: &str, amount: Decimal, reason: &str) -> StoreResult<()>;
}
