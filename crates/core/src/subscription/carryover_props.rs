//! Property-based tests for token carryover.

use proptest::prelude::*;

use super::budget::TokenBudget;
use super::carryover::{PreviousBudget, compute_carryover};

/// Strategy for tier limits (0 to 10M tokens).
fn limit_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000_000i64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The new effective limit is never below the new tier's limit, and exceeds it
    /// by exactly the unused remainder of the old budget.
    #[test]
    fn prop_effective_limit_is_new_limit_plus_remainder(
        old_limit in limit_strategy(),
        used in 0i64..20_000_000i64,
        new_limit in limit_strategy(),
    ) {
        let previous = PreviousBudget::new(None, Some(old_limit), used);
        let carry = compute_carryover(Some(previous), Some(new_limit));
        let budget = TokenBudget::new(carry.token_limit_override, Some(new_limit), 0);

        let expected_remainder = (old_limit - used).max(0);
        prop_assert_eq!(budget.limit, Some(new_limit + expected_remainder));
        prop_assert_eq!(carry.carried_tokens, expected_remainder);
    }

    /// An override is only ever stored when something was actually carried.
    #[test]
    fn prop_override_iff_carried(
        old_limit in limit_strategy(),
        used in 0i64..20_000_000i64,
        new_limit in limit_strategy(),
    ) {
        let previous = PreviousBudget::new(None, Some(old_limit), used);
        let carry = compute_carryover(Some(previous), Some(new_limit));

        prop_assert_eq!(carry.token_limit_override.is_some(), carry.carried_tokens > 0);
    }

    /// Unlimited target tiers never receive an override.
    #[test]
    fn prop_unlimited_tier_never_overridden(
        old_limit in proptest::option::of(limit_strategy()),
        used in 0i64..20_000_000i64,
    ) {
        let previous = PreviousBudget::new(None, old_limit, used);
        let carry = compute_carryover(Some(previous), None);

        prop_assert_eq!(carry.token_limit_override, None);
    }
}
