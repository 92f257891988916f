//! Policy Core Tests
//!
//! End-to-end coverage for the throttler, cost resolver, credit ledger, and
//! payout guard: the documented scenarios, the concurrency invariants, and
//! the pure-quote properties.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use credit_gate::{
    ActionCost, ActionKind, CostResolver, CostTableBuilder, CreditGate, CreditLedger, ManualClock,
    MemoryBalanceStore, MemoryCounterStore, PayoutDecision, PayoutDenied, PayoutGuard,
    PayoutPolicy, PolicyConfig, QuoteContext, Throttler,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn manual_throttler() -> (Throttler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(Utc::now()));
    (
        Throttler::new(Arc::new(MemoryCounterStore::new()), clock.clone()),
        clock,
    )
}

// =============================================================================
// Throttler
// =============================================================================

mod throttler_tests {
    use super::*;

    #[tokio::test]
    async fn test_five_per_minute_then_denied_with_retry_hint() {
        let (throttler, _clock) = manual_throttler();
        let window = Duration::seconds(60);

        for i in 0..5 {
            let decision = throttler
                .check_and_record("ai_requests:u1", 5, window)
                .await
                .unwrap();
            assert!(decision.is_allowed(), "call {} should be allowed", i + 1);
        }

        let denied = throttler
            .check_and_record("ai_requests:u1", 5, window)
            .await
            .unwrap();
        let retry_after = denied.retry_after().expect("sixth call should be denied");
        assert!(retry_after > Duration::zero());
        assert!(retry_after <= window);
    }

    #[tokio::test]
    async fn test_denied_call_becomes_allowed_after_window() {
        let (throttler, clock) = manual_throttler();
        let window = Duration::seconds(60);

        for _ in 0..5 {
            throttler.check_and_record("k", 5, window).await.unwrap();
        }
        assert!(!throttler.check_and_record("k", 5, window).await.unwrap().is_allowed());

        clock.advance(Duration::seconds(61));
        assert!(throttler.check_and_record("k", 5, window).await.unwrap().is_allowed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_at_most_limit_admitted_under_concurrency() {
        const CALLERS: usize = 64;
        const LIMIT: u32 = 5;

        init_tracing();
        let throttler = Throttler::new(
            Arc::new(MemoryCounterStore::new()),
            Arc::new(credit_gate::SystemClock),
        );

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let throttler = throttler.clone();
                tokio::spawn(async move {
                    throttler
                        .check_and_record("ai_requests:hot", LIMIT, Duration::seconds(60))
                        .await
                        .unwrap()
                        .is_allowed()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, LIMIT, "exactly the limit must be admitted");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_limit_holds_across_repeated_concurrent_bursts() {
        let throttler = Throttler::new(
            Arc::new(MemoryCounterStore::new()),
            Arc::new(credit_gate::SystemClock),
        );

        for burst in 0..10 {
            let key = format!("burst:{burst}");
            let handles: Vec<_> = (0..20)
                .map(|_| {
                    let throttler = throttler.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        throttler
                            .check_and_record(&key, 3, Duration::seconds(60))
                            .await
                            .unwrap()
                            .is_allowed()
                    })
                })
                .collect();

            let mut admitted = 0;
            for handle in handles {
                if handle.await.unwrap() {
                    admitted += 1;
                }
            }
            assert_eq!(admitted, 3);
        }
    }
}

// =============================================================================
// Cost resolver
// =============================================================================

mod quote_tests {
    use super::*;

    fn resolver() -> CostResolver {
        CostResolver::new(
            CostTableBuilder::new()
                .with_defaults()
                .email_automation_multiplier(dec!(1.2))
                .build(),
        )
    }

    #[test]
    fn test_forex_setup_quotes_base_cost() {
        let quote = resolver()
            .quote("forex", ActionKind::Setup, &QuoteContext::default())
            .unwrap();
        assert_eq!(quote.credit_cost, dec!(8.00));
    }

    #[test]
    fn test_email_automation_raises_quote_to_9_60() {
        let quote = resolver()
            .quote("forex", ActionKind::Setup, &QuoteContext::with_email_automation())
            .unwrap();
        assert_eq!(quote.credit_cost, dec!(9.60));
    }

    #[test]
    fn test_unpriced_category_uses_default_network_rates() {
        let with_category = resolver()
            .quote("sweepstakes", ActionKind::MarketingPlan, &QuoteContext::default())
            .unwrap();
        let default_rate = resolver()
            .quote("default", ActionKind::MarketingPlan, &QuoteContext::default())
            .unwrap();
        assert_eq!(with_category, default_rate);
    }
}

mod quote_properties {
    use proptest::prelude::*;

    use super::*;

    fn arb_cost() -> impl Strategy<Value = ActionCost> {
        // Base costs up to 10_000.00 credits, multipliers in (0, 4].
        (0u64..1_000_000, 1u64..400).prop_map(|(cents, mult)| {
            ActionCost::new(Decimal::new(cents as i64, 2))
                .with_multiplier(Decimal::new(mult as i64, 2))
        })
    }

    proptest! {
        #[test]
        fn quote_is_deterministic_and_never_negative(
            cost in arb_cost(),
            email in any::<bool>(),
        ) {
            let resolver = CostResolver::new(
                CostTableBuilder::new()
                    .cost("forex", ActionKind::Setup, cost)
                    .email_automation_multiplier(Decimal::new(12, 1))
                    .build(),
            );
            let ctx = QuoteContext { email_automation: email };

            let first = resolver.quote("forex", ActionKind::Setup, &ctx).unwrap();
            let second = resolver.quote("forex", ActionKind::Setup, &ctx).unwrap();

            prop_assert_eq!(first, second);
            prop_assert!(first.credit_cost >= Decimal::ZERO);
            // Rounded to the currency's minimum unit.
            prop_assert_eq!(
                first.credit_cost,
                first.credit_cost.round_dp(2)
            );
        }
    }
}

// =============================================================================
// Credit ledger
// =============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_insufficient_credits_is_a_clean_rejection() {
        let store = Arc::new(MemoryBalanceStore::new().with_balance("u1", dec!(10)));
        let ledger = CreditLedger::new(store.clone());

        let outcome = ledger.authorize_and_debit("u1", dec!(12), "gig").await.unwrap();
        assert!(!outcome.is_authorized());
        assert_eq!(ledger.balance("u1").await.unwrap(), dec!(10));
        assert!(store.ledger("u1").is_empty());
    }

    #[tokio::test]
    async fn test_debit_credit_round_trip_has_no_drift() {
        let ledger = CreditLedger::new(Arc::new(
            MemoryBalanceStore::new().with_balance("u1", dec!(25.75)),
        ));

        ledger.authorize_and_debit("u1", dec!(9.60), "setup").await.unwrap();
        ledger.credit("u1", dec!(9.60), "refund").await.unwrap();

        assert_eq!(ledger.balance("u1").await.unwrap(), dec!(25.75));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_balance_never_goes_negative_under_concurrent_debits() {
        let store = Arc::new(MemoryBalanceStore::new().with_balance("u1", dec!(50)));
        let ledger = CreditLedger::new(store.clone());

        // 40 concurrent debits of 3 credits against a balance of 50: at most
        // 16 can succeed.
        let handles: Vec<_> = (0..40)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .authorize_and_debit("u1", dec!(3), "gig")
                        .await
                        .unwrap()
                        .is_authorized()
                })
            })
            .collect();

        let mut authorized = 0;
        for handle in handles {
            if handle.await.unwrap() {
                authorized += 1;
            }
        }

        let balance = ledger.balance("u1").await.unwrap();
        assert!(balance >= Decimal::ZERO, "balance went negative: {balance}");
        assert_eq!(authorized, 16);
        assert_eq!(balance, dec!(2));
        assert_eq!(store.ledger("u1").len(), 16);
    }
}

// =============================================================================
// Payout guard
// =============================================================================

mod payout_tests {
    use super::*;

    fn guard() -> (PayoutGuard, Arc<ManualClock>) {
        let (throttler, clock) = manual_throttler();
        (PayoutGuard::new(throttler, PayoutPolicy::default()), clock)
    }

    #[tokio::test]
    async fn test_600_within_thresholds_is_allowed_unflagged() {
        let (guard, _clock) = guard();
        assert_eq!(
            guard.can_request_payout("u1", dec!(600)).await.unwrap(),
            PayoutDecision::Allowed {
                requires_admin_confirmation: false
            }
        );
    }

    #[tokio::test]
    async fn test_15000_is_allowed_but_needs_admin_confirmation() {
        let (guard, _clock) = guard();
        assert_eq!(
            guard.can_request_payout("u1", dec!(15000)).await.unwrap(),
            PayoutDecision::Allowed {
                requires_admin_confirmation: true
            }
        );
    }

    #[tokio::test]
    async fn test_fourth_payout_of_the_day_is_denied() {
        let (guard, clock) = guard();

        for _ in 0..3 {
            assert!(guard.can_request_payout("u1", dec!(600)).await.unwrap().is_allowed());
        }

        match guard.can_request_payout("u1", dec!(600)).await.unwrap() {
            PayoutDecision::Denied(PayoutDenied::DailyLimitReached { retry_after }) => {
                assert!(retry_after > Duration::zero());
                assert!(retry_after <= Duration::days(1));
            }
            other => panic!("expected daily limit denial, got {other:?}"),
        }

        clock.advance(Duration::days(1));
        assert!(guard.can_request_payout("u1", dec!(600)).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_users_have_independent_daily_quotas() {
        let (guard, _clock) = guard();

        for _ in 0..3 {
            guard.can_request_payout("u1", dec!(600)).await.unwrap();
        }
        assert!(!guard.can_request_payout("u1", dec!(600)).await.unwrap().is_allowed());
        assert!(guard.can_request_payout("u2", dec!(600)).await.unwrap().is_allowed());
    }
}

// =============================================================================
// Gate composition
// =============================================================================

mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_chain_from_config_to_debit() {
        let config = PolicyConfig::from_json_str(
            r#"{
                "ai_requests": { "limit": 2, "window_secs": 60 },
                "email_automation_multiplier": "1.2"
            }"#,
        )
        .unwrap();

        let balances = Arc::new(MemoryBalanceStore::new().with_balance("u1", dec!(100)));
        let gate = CreditGate::builder()
            .config(config)
            .balance_store(balances)
            .build();

        let grant = gate
            .authorize_generation(
                "u1",
                "forex",
                ActionKind::Setup,
                &QuoteContext::with_email_automation(),
            )
            .await
            .unwrap();
        assert_eq!(grant.credit_cost, dec!(9.60));
        assert_eq!(grant.remaining, dec!(90.40));

        gate.authorize_generation("u1", "forex", ActionKind::Setup, &QuoteContext::default())
            .await
            .unwrap();

        // Third request in the window trips the configured limit of 2.
        let rejection = gate
            .authorize_generation("u1", "forex", ActionKind::Setup, &QuoteContext::default())
            .await
            .unwrap_err();
        assert!(matches!(rejection, credit_gate::GateRejection::RateLimited { .. }));
    }
}
