//! Composition facade wiring the policy components to one pair of stores.
//!
//! A host builds one [`CreditGate`] at startup from its [`PolicyConfig`] and
//! store collaborators, then calls the individual guards (or the combined
//! [`CreditGate::authorize_generation`] chain) from its request handlers.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::PolicyConfig;
use crate::ledger::{CreditLedger, DebitOutcome};
use crate::payout::{PayoutDecision, PayoutGuard};
use crate::pricing::{ActionKind, CostResolver, QuoteContext, QuoteError};
use crate::store::{
    BalanceStore, CounterStore, MemoryBalanceStore, MemoryCounterStore, StoreError, StoreResult,
};
use crate::throttle::{ThrottleDecision, Throttler};

/// Why an AI-generation request was not granted.
#[derive(Debug, Error)]
pub enum GateRejection {
    #[error("rate limited, retry in {}s", retry_after.num_seconds())]
    RateLimited { retry_after: Duration },

    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: Decimal, required: Decimal },

    #[error(transparent)]
    UnknownAction(#[from] QuoteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A granted generation request: the quoted cost was debited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationGrant {
    pub credit_cost: Decimal,
    pub remaining: Decimal,
}

#[derive(Clone)]
pub struct CreditGate {
    config: PolicyConfig,
    throttler: Throttler,
    resolver: CostResolver,
    ledger: CreditLedger,
    payouts: PayoutGuard,
}

impl CreditGate {
    pub fn builder() -> CreditGateBuilder {
        CreditGateBuilder::new()
    }

    /// In-memory gate with stock configuration.
    pub fn in_memory() -> Self {
        Self::builder().build()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    pub fn resolver(&self) -> &CostResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn payouts(&self) -> &PayoutGuard {
        &self.payouts
    }

    /// Throttle check for one AI-generation request.
    pub async fn check_ai_request(&self, user_id: &str) -> StoreResult<ThrottleDecision> {
        let rule = self.config.ai_requests;
        self.throttler
            .check_and_record(&format!("ai_requests:{user_id}"), rule.limit, rule.window())
            .await
    }

    /// Throttle check for one generated marketing plan.
    pub async fn check_marketing_plan(&self, user_id: &str) -> StoreResult<ThrottleDecision> {
        let rule = self.config.marketing_plans;
        self.throttler
            .check_and_record(&format!("marketing_plans:{user_id}"), rule.limit, rule.window())
            .await
    }

    /// Payout guard passthrough.
    pub async fn can_request_payout(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> StoreResult<PayoutDecision> {
        self.payouts.can_request_payout(user_id, amount).await
    }

    /// The full admission chain for an AI-assisted action: throttle, quote,
    /// debit. A denial at any step leaves everything after it untouched.
    pub async fn authorize_generation(
        &self,
        user_id: &str,
        category: &str,
        kind: ActionKind,
        ctx: &QuoteContext,
    ) -> Result<GenerationGrant, GateRejection> {
        if let ThrottleDecision::Denied { retry_after } = self.check_ai_request(user_id).await? {
            return Err(GateRejection::RateLimited { retry_after });
        }

        let quote = self.resolver.quote(category, kind, ctx)?;
        let reason = format!("{category}:{kind}");
        match self
            .ledger
            .authorize_and_debit(user_id, quote.credit_cost, &reason)
            .await?
        {
            DebitOutcome::Authorized { remaining } => {
                debug!(user_id, category, kind = %kind, cost = %quote.credit_cost, "generation granted");
                Ok(GenerationGrant {
                    credit_cost: quote.credit_cost,
                    remaining,
                })
            }
            DebitOutcome::InsufficientCredits { balance, required } => {
                Err(GateRejection::InsufficientCredits { balance, required })
            }
        }
    }
}

/// Builder over the store/clock seams. Defaults to the in-memory stores and
/// the system clock.
#[derive(Default)]
pub struct CreditGateBuilder {
    config: Option<PolicyConfig>,
    counters: Option<Arc<dyn CounterStore>>,
    balances: Option<Arc<dyn BalanceStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CreditGateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PolicyConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counters = Some(store);
        self
    }

    pub fn balance_store(mut self, store: Arc<dyn BalanceStore>) -> Self {
        self.balances = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> CreditGate {
        let config = self.config.unwrap_or_default();
        let counters = self
            .counters
            .unwrap_or_else(|| Arc::new(MemoryCounterStore::new()));
        let balances = self
            .balances
            .unwrap_or_else(|| Arc::new(MemoryBalanceStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let throttler = Throttler::new(counters, clock);
        let resolver = CostResolver::new(config.cost_table());
        let ledger = CreditLedger::new(balances);
        let payouts = PayoutGuard::new(throttler.clone(), config.payout.clone());

        CreditGate {
            config,
            throttler,
            resolver,
            ledger,
            payouts,
        }
    }
}
