//! Credit pricing for billable actions.
//!
//! Costs come from a static per-category table loaded once at startup and
//! never mutated afterwards. Unknown categories fall back to a named default
//! category, mirroring how networks without their own pricing inherit the
//! default network's rates.

mod resolver;
mod table;

pub use resolver::{CostResolver, Quote, QuoteContext, QuoteError};
pub use table::{ActionCost, ActionKind, CostTable, CostTableBuilder};
