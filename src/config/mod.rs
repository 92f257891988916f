//! Policy configuration: throttle rules, cost entries, payout thresholds.
//!
//! Loaded once at process start and treated as an immutable value object
//! thereafter. `Default` carries the stock limits; hosts usually deserialize
//! the whole thing from their own configuration file.

use std::collections::HashMap;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payout::PayoutPolicy;
use crate::pricing::{ActionCost, ActionKind, CostTable, CostTableBuilder};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid policy config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One throttle call site: at most `limit` hits per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleRule {
    pub limit: u32,
    pub window_secs: u32,
}

impl ThrottleRule {
    pub const fn new(limit: u32, window_secs: u32) -> Self {
        Self { limit, window_secs }
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Per-user cap on AI-generation requests.
    #[serde(default = "PolicyConfig::default_ai_requests")]
    pub ai_requests: ThrottleRule,

    /// Per-user daily cap on generated marketing plans.
    #[serde(default = "PolicyConfig::default_marketing_plans")]
    pub marketing_plans: ThrottleRule,

    #[serde(default)]
    pub payout: PayoutPolicy,

    /// Category used when a network has no cost entry of its own.
    #[serde(default = "PolicyConfig::default_category")]
    pub default_category: String,

    /// `category -> action -> cost` overrides. Empty means stock pricing.
    #[serde(default)]
    pub costs: HashMap<String, HashMap<ActionKind, ActionCost>>,

    /// Applied on top of the entry cost when an action dispatches automated
    /// email.
    #[serde(default = "PolicyConfig::default_email_multiplier")]
    pub email_automation_multiplier: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ai_requests: Self::default_ai_requests(),
            marketing_plans: Self::default_marketing_plans(),
            payout: PayoutPolicy::default(),
            default_category: Self::default_category(),
            costs: HashMap::new(),
            email_automation_multiplier: Self::default_email_multiplier(),
        }
    }
}

impl PolicyConfig {
    fn default_ai_requests() -> ThrottleRule {
        ThrottleRule::new(5, 60)
    }

    fn default_marketing_plans() -> ThrottleRule {
        ThrottleRule::new(3, 86_400)
    }

    fn default_category() -> String {
        "default".into()
    }

    fn default_email_multiplier() -> Decimal {
        Decimal::ONE
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Materialize the immutable cost table: stock pricing when no overrides
    /// are configured, otherwise exactly the configured entries.
    pub fn cost_table(&self) -> CostTable {
        let mut builder = CostTableBuilder::new();
        if self.costs.is_empty() {
            builder = builder.with_defaults();
        } else {
            for (category, actions) in &self.costs {
                for (kind, cost) in actions {
                    builder = builder.cost(category.clone(), *kind, *cost);
                }
            }
        }
        builder
            .default_category(self.default_category.clone())
            .email_automation_multiplier(self.email_automation_multiplier)
            .build()
    }
}
