//! Credit debits and refunds against the balance store.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::store::{BalanceStore, StoreResult};

/// Outcome of an authorization attempt. Insufficient funds is an ordinary
/// result, not an error: the caller prompts the user to top up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Authorized { remaining: Decimal },
    InsufficientCredits { balance: Decimal, required: Decimal },
}

impl DebitOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

/// Check-then-debit gate over a [`BalanceStore`].
///
/// The store's `try_debit` is the atomic boundary: the ledger never reads a
/// balance and debits in two steps, so concurrent debits for one user cannot
/// overdraw the account.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn BalanceStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self { store }
    }

    /// Debit `credit_cost` from `user_id` if the balance covers it.
    pub async fn authorize_and_debit(
        &self,
        user_id: &str,
        credit_cost: Decimal,
        reason: &str,
    ) -> StoreResult<DebitOutcome> {
        if self.store.try_debit(user_id, credit_cost, reason).await? {
            let remaining = self.store.balance(user_id).await?;
            debug!(user_id, %credit_cost, %remaining, reason, "debit authorized");
            return Ok(DebitOutcome::Authorized { remaining });
        }

        let balance = self.store.balance(user_id).await?;
        warn!(user_id, %balance, required = %credit_cost, "insufficient credits");
        Ok(DebitOutcome::InsufficientCredits {
            balance,
            required: credit_cost,
        })
    }

    /// Credit `amount` back to `user_id` (top-up or refund).
    pub async fn credit(&self, user_id: &str, amount: Decimal, reason: &str) -> StoreResult<()> {
        self.store.credit(user_id, amount, reason).await?;
        debug!(user_id, %amount, reason, "credit applied");
        Ok(())
    }

    pub async fn balance(&self, user_id: &str) -> StoreResult<Decimal> {
        self.store.balance(user_id).await
    }
}
