//! Entity re-exports.

pub use super::ai_models::Entity as AiModels;
pub use super::grades::Entity as Grades;
pub use super::payment_transactions::Entity as PaymentTransactions;
pub use super::referral_points_logs::Entity as ReferralPointsLogs;
pub use super::referral_transactions::Entity as ReferralTransactions;
pub use super::referrals::Entity as Referrals;
pub use super::subjects::Entity as Subjects;
pub use super::subscription_tiers::Entity as SubscriptionTiers;
pub use super::token_usage_logs::Entity as TokenUsageLogs;
pub use super::user_ai_preferences::Entity as UserAiPreferences;
pub use super::user_referral_points::Entity as UserReferralPoints;
pub use super::user_subscriptions::Entity as UserSubscriptions;
