//! Points ledger arithmetic and reconciliation.
//!
//! The balance row is a running total; the transaction log is the source it
//! must always reconcile with: `points_balance == Σ signed points` and every
//! entry's `balance_after` equals the running sum at that entry.

use serde::{Deserialize, Serialize};

use super::error::ReferralError;
use super::types::PointsTransactionType;

/// A user's referral points totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBalance {
    /// Spendable points.
    pub points_balance: i32,
    /// Lifetime points earned.
    pub total_earned: i32,
    /// Lifetime points redeemed.
    pub total_redeemed: i32,
    /// Number of completed referrals.
    pub successful_referrals: i32,
}

impl PointsBalance {
    /// Balance after crediting a completed referral.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive points or on overflow.
    pub fn earn(&self, points: i32) -> Result<Self, ReferralError> {
        if points <= 0 {
            return Err(ReferralError::NonPositivePoints(points));
        }
        Ok(Self {
            points_balance: self
                .points_balance
                .checked_add(points)
                .ok_or(ReferralError::PointsOverflow)?,
            total_earned: self
                .total_earned
                .checked_add(points)
                .ok_or(ReferralError::PointsOverflow)?,
            total_redeemed: self.total_redeemed,
            successful_referrals: self.successful_referrals.saturating_add(1),
        })
    }

    /// Balance after spending `cost` points.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPoints` when the balance does not cover the cost.
    pub fn redeem(&self, cost: i32) -> Result<Self, ReferralError> {
        if cost <= 0 {
            return Err(ReferralError::NonPositivePoints(cost));
        }
        if self.points_balance < cost {
            return Err(ReferralError::InsufficientPoints {
                balance: self.points_balance,
                cost,
            });
        }
        Ok(Self {
            points_balance: self.points_balance - cost,
            total_earned: self.total_earned,
            total_redeemed: self
                .total_redeemed
                .checked_add(cost)
                .ok_or(ReferralError::PointsOverflow)?,
            successful_referrals: self.successful_referrals,
        })
    }
}

/// One entry of the points transaction log, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry kind.
    pub kind: PointsTransactionType,
    /// Signed points (earned positive, redeemed negative).
    pub points: i32,
    /// Balance recorded right after this entry.
    pub balance_after: i32,
}

/// Verifies that a balance agrees with its transaction log.
///
/// # Errors
///
/// Returns `BalanceAfterMismatch` for the first entry whose `balance_after` is
/// not the running sum, or `LedgerMismatch` if the final balance disagrees.
pub fn reconcile(points_balance: i32, entries: &[LedgerEntry]) -> Result<(), ReferralError> {
    let mut running: i64 = 0;
    for (index, entry) in entries.iter().enumerate() {
        running += i64::from(entry.kind.signed(entry.points));
        if i64::from(entry.balance_after) != running {
            return Err(ReferralError::BalanceAfterMismatch {
                index,
                expected: running,
                recorded: entry.balance_after,
            });
        }
    }
    if i64::from(points_balance) != running {
        return Err(ReferralError::LedgerMismatch {
            balance: points_balance,
            ledger_sum: running,
        });
    }
    Ok(())
}
