//! Host-boundary error taxonomy.
//!
//! Inside the crate, expected outcomes (limit reached, insufficient funds,
//! amount below minimum) are ordinary result values. `PolicyError` is the
//! adapter for hosts that want every rejection as one error type, e.g. to map
//! onto HTTP responses.

use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::gate::GateRejection;
use crate::payout::PayoutDenied;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PolicyError {
    /// No identity available. The host rejects before the policy layer runs;
    /// this variant exists so hosts have a single taxonomy to map from.
    #[error("no authenticated identity")]
    Unauthenticated,

    /// Too many requests in the current window.
    #[error("rate limited, retry in {}s", retry_after.num_seconds())]
    RateLimited { retry_after: Duration },

    /// The credit balance does not cover the action.
    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: Decimal, required: Decimal },

    /// Requested amount is below the configured minimum.
    #[error("amount {amount} is below the minimum of {minimum}")]
    InvalidAmount { amount: Decimal, minimum: Decimal },

    /// No cost entry exists for the requested action.
    #[error("unpriced action: {0}")]
    UnknownAction(#[from] crate::pricing::QuoteError),

    /// The counter/balance store failed. Infrastructure, not a user outcome;
    /// never treated as an implicit allow.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PolicyError {
    /// Whether retrying the same request later can succeed without any user
    /// action (top-up, amount change).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Store(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<PayoutDenied> for PolicyError {
    fn from(denied: PayoutDenied) -> Self {
        match denied {
            PayoutDenied::BelowMinimum { amount, minimum } => {
                Self::InvalidAmount { amount, minimum }
            }
            PayoutDenied::DailyLimitReached { retry_after } => Self::RateLimited { retry_after },
        }
    }
}

impl From<GateRejection> for PolicyError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::RateLimited { retry_after } => Self::RateLimited { retry_after },
            GateRejection::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            GateRejection::UnknownAction(err) => Self::UnknownAction(err),
            GateRejection::Store(err) => Self::Store(err),
        }
    }
}
