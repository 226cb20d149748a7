//! Subscription error types.

use thiserror::Error;

/// Subscription-related errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Status string not recognised.
    #[error("Unknown subscription status: {0}")]
    UnknownStatus(String),

    /// Billing cycle string not recognised.
    #[error("Unknown billing cycle: {0}")]
    UnknownBillingCycle(String),

    /// Token amount must be positive.
    #[error("Token amount must be positive, got {0}")]
    NonPositiveTokens(i64),

    /// Period end could not be represented.
    #[error("Billing period end is out of range")]
    PeriodOutOfRange,
}
