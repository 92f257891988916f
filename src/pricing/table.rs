//! Static credit-cost table definitions.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A billable action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Initial setup of a marketing network/category for a user.
    Setup,
    /// Landing-page hosting renewal.
    Renewal,
    /// AI-assisted marketing plan generation.
    MarketingPlan,
    /// A dropservicing gig purchase.
    ServiceGig,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Renewal => "renewal",
            Self::MarketingPlan => "marketing_plan",
            Self::ServiceGig => "service_gig",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price of one action: a base cost in credits and a per-entry multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCost {
    pub base_cost: Decimal,
    #[serde(default = "ActionCost::unit_multiplier")]
    pub multiplier: Decimal,
}

impl ActionCost {
    pub fn new(base_cost: Decimal) -> Self {
        Self {
            base_cost,
            multiplier: Decimal::ONE,
        }
    }

    pub fn with_multiplier(mut self, multiplier: Decimal) -> Self {
        self.multiplier = multiplier;
        self
    }

    fn unit_multiplier() -> Decimal {
        Decimal::ONE
    }
}

/// Immutable lookup table mapping `(category, action)` to a credit cost.
///
/// Lookup is an explicit two-step: the exact category first, then the named
/// default category. Only when neither carries the action is the action
/// unknown.
#[derive(Debug, Clone)]
pub struct CostTable {
    categories: HashMap<String, HashMap<ActionKind, ActionCost>>,
    default_category: String,
    email_automation_multiplier: Decimal,
}

/// Lowercase the category without allocating when it already is.
fn normalize(category: &str) -> Cow<'_, str> {
    if category.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(category.to_ascii_lowercase())
    } else {
        Cow::Borrowed(category)
    }
}

impl CostTable {
    pub fn builder() -> CostTableBuilder {
        CostTableBuilder::new()
    }

    pub fn get(&self, category: &str, kind: ActionKind) -> Option<&ActionCost> {
        let category = normalize(category);
        self.categories
            .get(category.as_ref())
            .and_then(|actions| actions.get(&kind))
            .or_else(|| {
                self.categories
                    .get(self.default_category.as_str())
                    .and_then(|actions| actions.get(&kind))
            })
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn email_automation_multiplier(&self) -> Decimal {
        self.email_automation_multiplier
    }
}

impl Default for CostTable {
    fn default() -> Self {
        CostTableBuilder::new().with_defaults().build()
    }
}

/// Builder for [`CostTable`]. Negative base costs and non-positive
/// multipliers are configuration mistakes and are rejected at build time.
#[derive(Debug, Default)]
pub struct CostTableBuilder {
    categories: HashMap<String, HashMap<ActionKind, ActionCost>>,
    default_category: Option<String>,
    email_automation_multiplier: Option<Decimal>,
}

impl CostTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock pricing for the bundled networks.
    pub fn with_defaults(self) -> Self {
        self.cost("default", ActionKind::Setup, ActionCost::new(dec!(5)))
            .cost("default", ActionKind::Renewal, ActionCost::new(dec!(3)))
            .cost("default", ActionKind::MarketingPlan, ActionCost::new(dec!(2)))
            .cost("default", ActionKind::ServiceGig, ActionCost::new(dec!(10)))
            .cost("forex", ActionKind::Setup, ActionCost::new(dec!(8)))
            .cost("forex", ActionKind::Renewal, ActionCost::new(dec!(4)))
            .cost("crypto", ActionKind::Setup, ActionCost::new(dec!(8)))
            .cost("dating", ActionKind::Setup, ActionCost::new(dec!(6)))
    }

    pub fn cost(mut self, category: impl Into<String>, kind: ActionKind, cost: ActionCost) -> Self {
        debug_assert!(cost.base_cost >= Decimal::ZERO, "base cost cannot be negative");
        debug_assert!(cost.multiplier > Decimal::ZERO, "multiplier must be positive");
        self.categories
            .entry(category.into().to_ascii_lowercase())
            .or_default()
            .insert(kind, cost);
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = Some(category.into().to_ascii_lowercase());
        self
    }

    pub fn email_automation_multiplier(mut self, multiplier: Decimal) -> Self {
        self.email_automation_multiplier = Some(multiplier);
        self
    }

    pub fn build(self) -> CostTable {
        CostTable {
            categories: self.categories,
            default_category: self.default_category.unwrap_or_else(|| "default".into()),
            email_automation_multiplier: self.email_automation_multiplier.unwrap_or(Decimal::ONE),
        }
    }
}
