//! Subscription lifecycle: statuses, billing periods, token budgets and carryover.

pub mod budget;
pub mod carryover;
pub mod error;
pub mod period;
pub mod types;

#[cfg(test)]
mod carryover_props;

pub use budget::TokenBudget;
pub use carryover::{Carryover, PreviousBudget, compute_carryover};
pub use error::SubscriptionError;
pub use period::BillingPeriod;
pub use types::{BillingCycle, PaymentStatus, SubscriptionStatus};
