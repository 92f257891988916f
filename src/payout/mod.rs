//! Payout request guard: minimum amount, daily cap, large-amount flagging.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::StoreResult;
use crate::throttle::{ThrottleDecision, Throttler};

/// Immutable payout thresholds, loaded once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    pub minimum: Decimal,
    pub large_amount_threshold: Decimal,
    pub max_per_day: u32,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self {
            minimum: Decimal::from(500),
            large_amount_threshold: Decimal::from(10_000),
            max_per_day: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutDenied {
    BelowMinimum { amount: Decimal, minimum: Decimal },
    DailyLimitReached { retry_after: Duration },
}

/// Outcome of a payout guard check. Large amounts are still allowed but
/// flagged for a manual admin confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutDecision {
    Allowed { requires_admin_confirmation: bool },
    Denied(PayoutDenied),
}

impl PayoutDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Synchronous per-request payout guard. Evaluated once per request; any
/// retry or backoff beyond the daily window is the caller's business.
#[derive(Clone)]
pub struct PayoutGuard {
    throttler: Throttler,
    policy: PayoutPolicy,
}

impl PayoutGuard {
    const WINDOW_SECS: i64 = 86_400;

    pub fn new(throttler: Throttler, policy: PayoutPolicy) -> Self {
        Self { throttler, policy }
    }

    pub fn policy(&self) -> &PayoutPolicy {
        &self.policy
    }

    /// Gate one payout request for `user_id`.
    ///
    /// The minimum-amount check runs before the throttle so a rejected
    /// amount never consumes daily quota.
    pub async fn can_request_payout(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> StoreResult<PayoutDecision> {
        if amount < self.policy.minimum {
            warn!(user_id, %amount, minimum = %self.policy.minimum, "payout below minimum");
            return Ok(PayoutDecision::Denied(PayoutDenied::BelowMinimum {
                amount,
                minimum: self.policy.minimum,
            }));
        }

        let key = format!("payouts:{user_id}");
        let decision = self
            .throttler
            .check_and_record(&key, self.policy.max_per_day, Duration::seconds(Self::WINDOW_SECS))
            .await?;
        if let ThrottleDecision::Denied { retry_after } = decision {
            return Ok(PayoutDecision::Denied(PayoutDenied::DailyLimitReached {
                retry_after,
            }));
        }

        let requires_admin_confirmation = amount > self.policy.large_amount_threshold;
        debug!(user_id, %amount, requires_admin_confirmation, "payout allowed");
        Ok(PayoutDecision::Allowed {
            requires_admin_confirmation,
        })
    }
}
