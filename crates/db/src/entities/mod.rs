//! `SeaORM` entities.

pub mod prelude;

pub mod ai_models;
pub mod grades;
pub mod id_list;
pub mod payment_transactions;
pub mod referral_points_logs;
pub mod referral_transactions;
pub mod referrals;
pub mod sea_orm_active_enums;
pub mod subjects;
pub mod subscription_tiers;
pub mod token_usage_logs;
pub mod user_ai_preferences;
pub mod user_referral_points;
pub mod user_subscriptions;
