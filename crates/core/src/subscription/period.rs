//! Billing period boundaries.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use super::error::SubscriptionError;
use super::types::BillingCycle;

/// A billing period. Lifetime subscriptions have no end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Period start.
    pub start: DateTime<Utc>,
    /// Period end, exclusive.
    pub end: Option<DateTime<Utc>>,
}

impl BillingPeriod {
    /// Computes the period that starts at `start` for the given cycle.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::PeriodOutOfRange` if the end date overflows.
    pub fn starting_at(cycle: BillingCycle, start: DateTime<Utc>) -> Result<Self, SubscriptionError> {
        let end = match cycle {
            BillingCycle::Daily => Some(
                start
                    .checked_add_signed(Duration::days(1))
                    .ok_or(SubscriptionError::PeriodOutOfRange)?,
            ),
            BillingCycle::Monthly => Some(
                start
                    .checked_add_months(Months::new(1))
                    .ok_or(SubscriptionError::PeriodOutOfRange)?,
            ),
            BillingCycle::Yearly => Some(
                start
                    .checked_add_months(Months::new(12))
                    .ok_or(SubscriptionError::PeriodOutOfRange)?,
            ),
            BillingCycle::Lifetime => None,
        };

        Ok(Self { start, end })
    }

    /// Returns true once `now` has reached the period end.
    #[must_use]
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| now >= end)
    }
}
