//! Domain events published by the subscription lifecycle.
//!
//! Events are dispatched synchronously to their handlers inside the
//! transaction of the use case that published them, so each state transition
//! runs its handler exactly once and shares its commit or rollback.

use serde::{Deserialize, Serialize};
use studyhub_shared::types::{PaymentId, SubscriptionId, TierId, UserId};

use crate::subscription::{BillingCycle, SubscriptionStatus};

/// A payment moved into `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    /// The payment.
    pub payment_id: PaymentId,
    /// Paying user.
    pub user_id: UserId,
    /// Purchased tier.
    pub tier_id: TierId,
    /// Purchased billing cycle.
    pub billing_cycle: BillingCycle,
}

/// A subscription was written with status `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionActivated {
    /// The subscription row.
    pub subscription_id: SubscriptionId,
    /// Subscriber.
    pub user_id: UserId,
    /// Tier now in force.
    pub tier_id: TierId,
    /// Status before the write; `None` when the row was created.
    pub previous_status: Option<SubscriptionStatus>,
    /// Whether this was a tier change on an already active subscription.
    pub tier_changed: bool,
}

impl SubscriptionActivated {
    /// True when the row was created or moved out of a non-active status.
    #[must_use]
    pub fn is_status_transition(&self) -> bool {
        SubscriptionStatus::Active.is_activation_from(self.previous_status)
    }
}

/// Every event the lifecycle publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// See [`PaymentCompleted`].
    PaymentCompleted(PaymentCompleted),
    /// See [`SubscriptionActivated`].
    SubscriptionActivated(SubscriptionActivated),
}

impl DomainEvent {
    /// Stable event name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PaymentCompleted(_) => "payment_completed",
            Self::SubscriptionActivated(_) => "subscription_activated",
        }
    }
}
