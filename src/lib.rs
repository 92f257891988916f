//! # credit-gate
//!
//! Credit-based rate limiting and cost accounting for affiliate-marketing
//! platforms: a fixed-window request throttler, a credit cost resolver over a
//! static per-network price table, and a payout guard, all sharing one pair
//! of injected store collaborators.
//!
//! The crate is a policy layer, not a service: routing, persistence, and the
//! actual AI generation or payout disbursement live in the hosting
//! application. Counters and balances sit behind the [`store`] traits so a
//! host can back them with its cache or database; the bundled in-memory
//! stores cover tests and single-node deployments.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use credit_gate::{ActionKind, CreditGate, QuoteContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = CreditGate::in_memory();
//! gate.ledger().credit("user-1", "50".parse()?, "signup bonus").await?;
//!
//! let grant = gate
//!     .authorize_generation("user-1", "forex", ActionKind::Setup, &QuoteContext::default())
//!     .await?;
//! println!("debited {} credits, {} left", grant.credit_cost, grant.remaining);
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod payout;
pub mod pricing;
pub mod store;
pub mod throttle;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PolicyConfig, ThrottleRule};
pub use error::PolicyError;
pub use gate::{CreditGate, CreditGateBuilder, GateRejection, GenerationGrant};
pub use ledger::{CreditLedger, DebitOutcome};
pub use payout::{PayoutDecision, PayoutDenied, PayoutGuard, PayoutPolicy};
pub use pricing::{
    ActionCost, ActionKind, CostResolver, CostTable, CostTableBuilder, Quote, QuoteContext,
    QuoteError,
};
pub use store::{
    BalanceStore, CounterStore, LedgerEntry, MemoryBalanceStore, MemoryCounterStore, RateWindow,
    StoreError, StoreResult,
};
pub use throttle::{ThrottleDecision, Throttler};
