//! Referral award decisions and the points ledger.

pub mod decision;
pub mod error;
pub mod ledger;
pub mod types;

#[cfg(test)]
mod ledger_props;

pub use decision::{AwardDecision, AwardPolicy, AwardSubject};
pub use error::ReferralError;
pub use ledger::{LedgerEntry, PointsBalance, reconcile};
pub use types::{AwardOutcome, AwardReason, PointsTransactionType, ReferralStatus};
