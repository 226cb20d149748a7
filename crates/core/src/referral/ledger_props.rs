//! Property-based tests for the points ledger.
//!
//! Replays arbitrary award/redeem sequences the way the persistence layer
//! applies them and checks the reconciliation law after every step.

use proptest::prelude::*;

use super::ledger::{LedgerEntry, PointsBalance, reconcile};
use super::types::PointsTransactionType;

#[derive(Debug, Clone, Copy)]
enum Op {
    Award(i32),
    Redeem(i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i32..1_000i32).prop_map(Op::Award),
        (1i32..3_000i32).prop_map(Op::Redeem),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Balance always equals the sum of signed ledger points, and rejected
    /// redemptions leave both untouched.
    #[test]
    fn prop_balance_reconciles_with_ledger(ops in prop::collection::vec(op_strategy(), 0..50)) {
        let mut balance = PointsBalance::default();
        let mut entries: Vec<LedgerEntry> = Vec::new();

        for op in ops {
            let (kind, points, next) = match op {
                Op::Award(p) => (PointsTransactionType::Earned, p, balance.earn(p)),
                Op::Redeem(p) => (PointsTransactionType::Redeemed, p, balance.redeem(p)),
            };
            if let Ok(next) = next {
                balance = next;
                entries.push(LedgerEntry {
                    kind,
                    points: kind.signed(points),
                    balance_after: balance.points_balance,
                });
            }
            prop_assert!(balance.points_balance >= 0);
            prop_assert!(reconcile(balance.points_balance, &entries).is_ok());
        }

        prop_assert_eq!(
            balance.points_balance,
            balance.total_earned - balance.total_redeemed
        );
    }
}
