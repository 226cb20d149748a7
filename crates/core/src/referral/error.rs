//! Referral and points ledger error types.

use thiserror::Error;

/// Referral-related errors.
#[derive(Debug, Error)]
pub enum ReferralError {
    /// A user cannot refer themselves.
    #[error("A user cannot refer themselves")]
    SelfReferral,

    /// Points amount must be positive.
    #[error("Points must be positive, got {0}")]
    NonPositivePoints(i32),

    /// Balance does not cover the redemption.
    #[error("Insufficient points: balance {balance}, cost {cost}")]
    InsufficientPoints {
        /// Current balance.
        balance: i32,
        /// Points required.
        cost: i32,
    },

    /// Tier cannot be bought with points.
    #[error("Tier {0} cannot be redeemed with points")]
    NotRedeemable(String),

    /// Points arithmetic overflowed.
    #[error("Points arithmetic overflow")]
    PointsOverflow,

    /// An entry's `balance_after` is not the running sum.
    #[error("Ledger entry {index} records balance {recorded}, expected {expected}")]
    BalanceAfterMismatch {
        /// Position of the entry in insertion order.
        index: usize,
        /// Running sum up to and including the entry.
        expected: i64,
        /// Recorded `balance_after`.
        recorded: i32,
    },

    /// Balance row disagrees with the transaction log.
    #[error("Points balance {balance} does not match ledger sum {ledger_sum}")]
    LedgerMismatch {
        /// Stored balance.
        balance: i32,
        /// Sum of signed ledger points.
        ledger_sum: i64,
    },
}
