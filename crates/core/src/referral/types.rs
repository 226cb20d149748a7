//! Referral vocabulary: statuses, award outcomes and ledger entry kinds.
//!
//! Outcomes and reasons are closed enumerations so the audit trail stays
//! machine-checkable; free-text diagnostics live next to them, never in them.

use serde::{Deserialize, Serialize};

/// Status of a referral relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    /// Referred user signed up but has not converted to a paid tier.
    Pending,
    /// Points were awarded. Immutable from here on.
    Completed,
}

impl ReferralStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// Outcome recorded for every award attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardOutcome {
    /// Points were awarded.
    Success,
    /// A legitimate no-op branch.
    Skipped,
    /// The award sequence failed and was rolled back.
    Error,
}

impl AwardOutcome {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Why an award attempt ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    /// Points were credited to the referrer.
    Awarded,
    /// The activated subscription (or its tier) could not be resolved.
    SubscriptionNotFound,
    /// The free tier never earns the referrer anything.
    FreeTier,
    /// Subscriber was not referred, or the referral was already awarded.
    NoPendingReferral,
    /// The tier awards zero points.
    NoPointsConfigured,
    /// A concurrent activation completed the referral first.
    AlreadyAwarded,
    /// Unexpected failure during the award sequence.
    AwardFailed,
}

impl AwardReason {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Awarded => "awarded",
            Self::SubscriptionNotFound => "subscription_not_found",
            Self::FreeTier => "free_tier",
            Self::NoPendingReferral => "no_pending_referral",
            Self::NoPointsConfigured => "no_points_configured",
            Self::AlreadyAwarded => "already_awarded",
            Self::AwardFailed => "award_failed",
        }
    }

    /// Outcome implied by this reason.
    #[must_use]
    pub const fn outcome(self) -> AwardOutcome {
        match self {
            Self::Awarded => AwardOutcome::Success,
            Self::AwardFailed => AwardOutcome::Error,
            Self::SubscriptionNotFound
            | Self::FreeTier
            | Self::NoPendingReferral
            | Self::NoPointsConfigured
            | Self::AlreadyAwarded => AwardOutcome::Skipped,
        }
    }

    /// Human-readable explanation for operators.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Awarded => "referral points awarded",
            Self::SubscriptionNotFound => "subscription not found",
            Self::FreeTier => "free tier does not earn referral points",
            Self::NoPendingReferral => "no pending referral: not referred, or already awarded",
            Self::NoPointsConfigured => "no referral points configured for tier",
            Self::AlreadyAwarded => "referral completed by a concurrent activation",
            Self::AwardFailed => "award sequence failed",
        }
    }
}

/// Kind of a points ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointsTransactionType {
    /// Points credited for a completed referral.
    Earned,
    /// Points spent on a tier purchase.
    Redeemed,
}

impl PointsTransactionType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Redeemed => "redeemed",
        }
    }

    /// Signs a points amount for the ledger: earned is positive, redeemed negative.
    #[must_use]
    pub const fn signed(self, points: i32) -> i32 {
        match self {
            Self::Earned => points.abs(),
            Self::Redeemed => -points.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_outcomes() {
        assert_eq!(AwardReason::Awarded.outcome(), AwardOutcome::Success);
        assert_eq!(AwardReason::FreeTier.outcome(), AwardOutcome::Skipped);
        assert_eq!(AwardReason::AlreadyAwarded.outcome(), AwardOutcome::Skipped);
        assert_eq!(AwardReason::AwardFailed.outcome(), AwardOutcome::Error);
    }

    #[test]
    fn test_signed_points() {
        assert_eq!(PointsTransactionType::Earned.signed(250), 250);
        assert_eq!(PointsTransactionType::Redeemed.signed(1000), -1000);
        assert_eq!(PointsTransactionType::Redeemed.signed(-1000), -1000);
    }

    #[test]
    fn test_storage_names() {
        assert_eq!(AwardReason::NoPointsConfigured.as_str(), "no_points_configured");
        assert_eq!(AwardOutcome::Skipped.as_str(), "skipped");
        assert_eq!(ReferralStatus::Completed.as_str(), "completed");
    }
}
