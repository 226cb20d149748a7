//! `SeaORM` active enums, stored as short strings.
//!
//! Each enum mirrors a `studyhub-core` vocabulary type one-to-one; the `From`
//! impls keep the two in lockstep.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::{referral, subscription};

/// Generates the two-way conversions between a storage enum and its core twin.
macro_rules! mirror_core_enum {
    ($storage:ident, $core:path, [$($variant:ident),+ $(,)?]) => {
        impl From<$storage> for $core {
            fn from(value: $storage) -> Self {
                match value {
                    $($storage::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$core> for $storage {
            fn from(value: $core) -> Self {
                type Core = $core;
                match value {
                    $(Core::$variant => Self::$variant,)+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

mirror_core_enum!(
    SubscriptionStatus,
    subscription::SubscriptionStatus,
    [Active, Cancelled, Expired]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
    #[sea_orm(string_value = "lifetime")]
    Lifetime,
}

mirror_core_enum!(
    BillingCycle,
    subscription::BillingCycle,
    [Daily, Monthly, Yearly, Lifetime]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

mirror_core_enum!(
    PaymentStatus,
    subscription::PaymentStatus,
    [Pending, Completed, Failed]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
}

mirror_core_enum!(ReferralStatus, referral::ReferralStatus, [Pending, Completed]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AwardOutcome {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "skipped")]
    Skipped,
    #[sea_orm(string_value = "error")]
    Error,
}

mirror_core_enum!(AwardOutcome, referral::AwardOutcome, [Success, Skipped, Error]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    #[sea_orm(string_value = "awarded")]
    Awarded,
    #[sea_orm(string_value = "subscription_not_found")]
    SubscriptionNotFound,
    #[sea_orm(string_value = "free_tier")]
    FreeTier,
    #[sea_orm(string_value = "no_pending_referral")]
    NoPendingReferral,
    #[sea_orm(string_value = "no_points_configured")]
    NoPointsConfigured,
    #[sea_orm(string_value = "already_awarded")]
    AlreadyAwarded,
    #[sea_orm(string_value = "award_failed")]
    AwardFailed,
}

mirror_core_enum!(
    AwardReason,
    referral::AwardReason,
    [
        Awarded,
        SubscriptionNotFound,
        FreeTier,
        NoPendingReferral,
        NoPointsConfigured,
        AlreadyAwarded,
        AwardFailed,
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PointsTransactionType {
    #[sea_orm(string_value = "earned")]
    Earned,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
}

mirror_core_enum!(
    PointsTransactionType,
    referral::PointsTransactionType,
    [Earned, Redeemed]
);
