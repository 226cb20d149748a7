//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ai_model;
pub mod payment;
pub mod referral;
pub mod subscription;
pub mod tier;

pub use ai_model::{AiModelRepoError, AiModelRepository};
pub use payment::{
    CreatePaymentInput, PaymentCompletion, PaymentError, PaymentRepository,
    REFERRAL_POINTS_PROVIDER,
};
pub use referral::{PointsSummary, Redemption, ReferralLedgerError, ReferralRepository};
pub use subscription::{
    EntitlementSnapshot, LimitCheckResult, PaperAccess, SubscriptionRepoError,
    SubscriptionRepository,
};
pub use tier::TierRepository;
