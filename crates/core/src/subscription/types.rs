//! Subscription lifecycle states and billing vocabulary.

use serde::{Deserialize, Serialize};

use super::error::SubscriptionError;

/// Lifecycle status of a user subscription.
///
/// Subscriptions are never deleted; moving to `Cancelled` or `Expired` is the
/// soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Subscription grants its tier's entitlements.
    Active,
    /// Cancelled by the user or an operator.
    Cancelled,
    /// Billing period ended without renewal.
    Expired,
}

impl SubscriptionStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Returns true when moving from `previous` to `self` is an activation.
    ///
    /// A missing previous row counts as a transition.
    #[must_use]
    pub fn is_activation_from(self, previous: Option<Self>) -> bool {
        self == Self::Active && previous != Some(Self::Active)
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(SubscriptionError::UnknownStatus(other.to_string())),
        }
    }
}

/// Billing cycle chosen at purchase time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// One day.
    Daily,
    /// One calendar month.
    Monthly,
    /// One calendar year.
    Yearly,
    /// Never expires.
    Lifetime,
}

impl BillingCycle {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "lifetime" => Ok(Self::Lifetime),
            other => Err(SubscriptionError::UnknownBillingCycle(other.to_string())),
        }
    }
}

/// Status of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting confirmation from the payment provider.
    Pending,
    /// Payment settled; triggers activation once.
    Completed,
    /// Payment rejected; no side effects.
    Failed,
}

impl PaymentStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if `old → new` is a transition into `Completed`.
    ///
    /// This compares statuses rather than checking for the payment's
    /// existence, so re-delivering a completion is a no-op.
    #[must_use]
    pub fn is_completion(old: Option<Self>, new: Self) -> bool {
        new == Self::Completed && old != Some(Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(None, PaymentStatus::Completed, true)]
    #[case(Some(PaymentStatus::Pending), PaymentStatus::Completed, true)]
    #[case(Some(PaymentStatus::Failed), PaymentStatus::Completed, true)]
    #[case(Some(PaymentStatus::Completed), PaymentStatus::Completed, false)]
    #[case(Some(PaymentStatus::Pending), PaymentStatus::Failed, false)]
    #[case(None, PaymentStatus::Pending, false)]
    fn test_completion_transition(
        #[case] old: Option<PaymentStatus>,
        #[case] new: PaymentStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(PaymentStatus::is_completion(old, new), expected);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(SubscriptionStatus::Cancelled), true)]
    #[case(Some(SubscriptionStatus::Expired), true)]
    #[case(Some(SubscriptionStatus::Active), false)]
    fn test_activation_transition(
        #[case] previous: Option<SubscriptionStatus>,
        #[case] expected: bool,
    ) {
        assert_eq!(
            SubscriptionStatus::Active.is_activation_from(previous),
            expected
        );
        assert!(!SubscriptionStatus::Cancelled.is_activation_from(previous));
    }

    #[test]
    fn test_billing_cycle_round_trips_through_str() {
        for cycle in [
            BillingCycle::Daily,
            BillingCycle::Monthly,
            BillingCycle::Yearly,
            BillingCycle::Lifetime,
        ] {
            assert_eq!(BillingCycle::from_str(cycle.as_str()).unwrap(), cycle);
        }
        assert!(BillingCycle::from_str("weekly").is_err());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            SubscriptionStatus::from_str("expired").unwrap(),
            SubscriptionStatus::Expired
        );
        assert!(matches!(
            SubscriptionStatus::from_str("paused"),
            Err(SubscriptionError::UnknownStatus(s)) if s == "paused"
        ));
    }
}
