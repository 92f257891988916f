//! Quote computation over the cost table.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::debug;

use super::table::{ActionKind, CostTable};

/// Caller-supplied flags that affect a quote.
///
/// `email_automation` is an explicit flag: the resolver never infers it from
/// the action itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteContext {
    /// The action includes automated email dispatch.
    pub email_automation: bool,
}

impl QuoteContext {
    pub fn with_email_automation() -> Self {
        Self {
            email_automation: true,
        }
    }
}

/// A priced action, rounded to the currency's minimum unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub credit_cost: Decimal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteError {
    /// Neither the category nor the default category prices this action.
    #[error("no cost entry for {kind} in category '{category}' or the default category")]
    UnknownAction { category: String, kind: ActionKind },
}

/// Pure pricing function: table lookup, multipliers, round half-up to two
/// decimal places. No I/O, no state.
#[derive(Debug, Clone)]
pub struct CostResolver {
    table: CostTable,
}

impl CostResolver {
    pub fn new(table: CostTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CostTable {
        &self.table
    }

    pub fn quote(
        &self,
        category: &str,
        kind: ActionKind,
        ctx: &QuoteContext,
    ) -> Result<Quote, QuoteError> {
        let cost = self
            .table
            .get(category, kind)
            .ok_or_else(|| QuoteError::UnknownAction {
                category: category.to_string(),
                kind,
            })?;

        let mut credit_cost = cost.base_cost * cost.multiplier;
        if ctx.email_automation {
            credit_cost *= self.table.email_automation_multiplier();
        }
        let credit_cost =
            credit_cost.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        debug!(category, kind = %kind, %credit_cost, "quoted action");
        Ok(Quote { credit_cost })
    }
}
