//! Fixed-window request throttling keyed by caller identity.

mod limiter;

pub use limiter::{ThrottleDecision, Throttler};
