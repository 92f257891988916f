//! Fixed-window counter against a shared store.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::store::{CounterStore, RateWindow, StoreResult};

/// Outcome of a throttle check. Denials carry the time left in the current
/// window so callers can surface a retry hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Denied { retry_after: Duration },
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Allowed => None,
            Self::Denied { retry_after } => Some(*retry_after),
        }
    }
}

/// Per-key fixed-window throttler.
///
/// Limits and windows are supplied per call site (AI endpoints, daily plan
/// caps, payout caps) rather than baked in; the throttler only owns the
/// counting discipline. "At most `limit` per window" is a hard invariant:
/// the increment goes through the store's compare-and-swap, so two racing
/// calls for the same key can never both slip past the limit.
#[derive(Clone)]
pub struct Throttler {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl Throttler {
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Admit or deny one hit for `key`, recording it when admitted.
    ///
    /// Denials never mutate the store. A lost compare-and-swap means another
    /// writer moved the window first; the loop re-reads and decides against
    /// the fresh state, so contention can only make the outcome stricter.
    pub async fn check_and_record(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> StoreResult<ThrottleDecision> {
        // A zero limit disables the call site outright: every hit is denied,
        // including the first of a fresh window, and nothing is recorded.
        if limit == 0 {
            warn!(key, "rate limited, limit is zero");
            return Ok(ThrottleDecision::Denied {
                retry_after: window,
            });
        }

        loop {
            let now = self.clock.now();
            let current = self.store.get(key).await?;

            let (expected, next) = match &current {
                None => (None, RateWindow::opened_at(now, window)),
                Some(existing) if existing.is_expired(now) => {
                    (Some(existing), RateWindow::opened_at(now, window))
                }
                Some(existing) => {
                    if existing.count >= limit {
                        let retry_after = existing.remaining(now);
                        warn!(key, limit, retry_after_secs = retry_after.num_seconds(), "rate limited");
                        return Ok(ThrottleDecision::Denied { retry_after });
                    }
                    let mut bumped = existing.clone();
                    bumped.count += 1;
                    (Some(existing), bumped)
                }
            };

            if self.store.compare_and_swap(key, expected, next).await? {
                debug!(key, limit, "throttle hit recorded");
                return Ok(ThrottleDecision::Allowed);
            }
        }
    }
}
