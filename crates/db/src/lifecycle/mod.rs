//! Event-driven subscription lifecycle.
//!
//! Use cases publish domain events on an [`EventBus`] bound to their
//! transaction. Handlers run synchronously in that transaction and may publish
//! follow-up events:
//!
//! ```text
//! PaymentCompleted ──▶ activation ──▶ SubscriptionActivated ──▶ award
//! ```

pub mod activation;
pub mod award;

use std::collections::VecDeque;

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr};
use thiserror::Error;
use tracing::{debug, error};

use studyhub_core::events::DomainEvent;
use studyhub_core::referral::{AwardPolicy, AwardReason};
use studyhub_core::subscription::SubscriptionError;

pub use activation::{ActivationOutcome, ActivationSkip};
pub use award::{AwardFailure, AwardRecord};

/// Lifecycle handler errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Database error outside the award sequence.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Billing period computation failed.
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// The award sequence failed and was rolled back.
    #[error("Referral award failed for subscription {}: {}", .0.subscription_id, .0.message)]
    AwardFailed(AwardFailure),
}

/// Everything the handlers did for one published event.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Activation outcomes, in dispatch order.
    pub activations: Vec<ActivationOutcome>,
    /// Award attempts, in dispatch order.
    pub awards: Vec<AwardRecord>,
}

impl DispatchReport {
    /// The first activation outcome, if any.
    #[must_use]
    pub fn activation(&self) -> Option<&ActivationOutcome> {
        self.activations.first()
    }

    /// The first award attempt, if any.
    #[must_use]
    pub fn award(&self) -> Option<&AwardRecord> {
        self.awards.first()
    }
}

/// Synchronous, in-transaction event dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct EventBus<'a> {
    txn: &'a DatabaseTransaction,
    policy: &'a AwardPolicy,
}

impl<'a> EventBus<'a> {
    /// Binds a bus to `txn`.
    #[must_use]
    pub const fn new(txn: &'a DatabaseTransaction, policy: &'a AwardPolicy) -> Self {
        Self { txn, policy }
    }

    /// Publishes `event` and every event its handlers publish, breadth first.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; the caller must roll back.
    pub async fn publish(&self, event: DomainEvent) -> Result<DispatchReport, LifecycleError> {
        let mut queue = VecDeque::from([event]);
        let mut report = DispatchReport::default();

        while let Some(event) = queue.pop_front() {
            debug!(event = event.name(), "Dispatching domain event");
            match event {
                DomainEvent::PaymentCompleted(payment) => {
                    let outcome = activation::on_payment_completed(self.txn, &payment).await?;
                    if let Some(activated) = outcome.event() {
                        queue.push_back(DomainEvent::SubscriptionActivated(activated));
                    }
                    report.activations.push(outcome);
                }
                DomainEvent::SubscriptionActivated(activated) => {
                    let record =
                        award::on_subscription_activated(self.txn, self.policy, &activated)
                            .await?;
                    report.awards.push(record);
                }
            }
        }

        Ok(report)
    }
}

/// Persists the error log row for a failed award.
///
/// Must run on a connection outside the rolled-back transaction.
pub async fn record_award_failure(db: &DatabaseConnection, failure: &AwardFailure) {
    let record = AwardRecord {
        subscription_id: failure.subscription_id,
        outcome: AwardReason::AwardFailed.outcome(),
        reason: AwardReason::AwardFailed,
        referral_id: failure.referral_id,
        referrer_id: None,
        points: 0,
        balance_after: None,
    };
    if let Err(e) =
        award::write_log(db, &record, Some(failure.user_id), Some(failure.message.clone())).await
    {
        error!(
            error = %e,
            subscription_id = %failure.subscription_id,
            "Failed to persist referral award error log"
        );
    }
}
