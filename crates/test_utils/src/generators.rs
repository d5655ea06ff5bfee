//! Property-Based Test Generators
//!
//! Proptest strategies for engine inputs. Amounts are whole cents so the
//! decimal arithmetic under test never needs rounding.

use domain_claims::{ClaimFacts, PolicySnapshot, PolicyStatus};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::builders::{ClaimFactsBuilder, PolicySnapshotBuilder};

/// Strategy for positive amounts between 0.01 and 1,000,000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for probabilities in `[0, 1]`
pub fn probability_strategy() -> impl Strategy<Value = f64> {
    0.0f64..=1.0f64
}

/// Strategy for the status labels that reject a claim outright
pub fn terminal_status_strategy() -> impl Strategy<Value = PolicyStatus> {
    prop_oneof![
        Just("expired"),
        Just("Expired"),
        Just("inactive"),
        Just("INACTIVE"),
        Just("terminated"),
        Just("cancelled"),
        Just("canceled"),
    ]
    .prop_map(PolicyStatus::parse)
}

/// Claim amount strictly above what the policy has left
///
/// Other fields vary freely, including status and history count, to show
/// the limit rejection does not depend on them.
pub fn limit_exceeded_case() -> impl Strategy<Value = (ClaimFacts, PolicySnapshot)> {
    (
        amount_strategy(),
        amount_strategy(),
        1i64..10_000_000i64,
        0u32..10u32,
        prop_oneof![Just(PolicyStatus::Active), terminal_status_strategy()],
    )
        .prop_map(|(limit, past_fraction_seed, excess_cents, history, status)| {
            let past = (past_fraction_seed % limit).round_dp(2);
            let available = limit - past;
            let amount = available + Decimal::new(excess_cents, 2);
            let claim = ClaimFactsBuilder::new().with_amount(amount).build();
            let policy = PolicySnapshotBuilder::new()
                .with_limit(limit)
                .with_past_claims(past)
                .with_history_count(history)
                .with_status(status)
                .build();
            (claim, policy)
        })
}

/// Claim within the remaining limit against a terminal policy
pub fn terminal_within_limit_case() -> impl Strategy<Value = (ClaimFacts, PolicySnapshot)> {
    (amount_strategy(), 1u32..=100u32, terminal_status_strategy()).prop_map(|(limit, percent, status)| {
        let amount = (limit * Decimal::from(percent) / Decimal::from(100)).round_dp(2);
        let amount = amount.max(Decimal::new(1, 2)).min(limit);
        let claim = ClaimFactsBuilder::new().with_amount(amount).build();
        let policy = PolicySnapshotBuilder::new()
            .with_limit(limit)
            .with_past_claims(Decimal::ZERO)
            .with_status(status)
            .build();
        (claim, policy)
    })
}
