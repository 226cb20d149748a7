//! Migration to create the referral ledger: `referrals`,
//! `user_referral_points`, `referral_transactions` and `referral_points_logs`.

use sea_orm_migration::prelude::*;

use super::m20261019_000001_catalog::SubscriptionTiers;
use super::m20261019_000002_subscriptions::UserSubscriptions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Referrals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Referrals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Referrals::ReferrerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Referrals::ReferredId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Referrals::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Referrals::PointsAwarded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Referrals::SubscriptionTierId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Referrals::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Referrals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referrals_tier")
                            .from(Referrals::Table, Referrals::SubscriptionTierId)
                            .to(SubscriptionTiers::Table, SubscriptionTiers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_referrals_referrer")
                    .table(Referrals::Table)
                    .col(Referrals::ReferrerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserReferralPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserReferralPoints::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::PointsBalance)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::TotalEarned)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::TotalRedeemed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::SuccessfulReferrals)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserReferralPoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(UserReferralPoints::PointsBalance).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferralTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReferralTransactions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReferralTransactions::TransactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralTransactions::Points).integer().not_null())
                    .col(
                        ColumnDef::new(ReferralTransactions::BalanceAfter)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralTransactions::ReferralId).uuid().null())
                    .col(
                        ColumnDef::new(ReferralTransactions::SubscriptionId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReferralTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referral_transactions_referral")
                            .from(ReferralTransactions::Table, ReferralTransactions::ReferralId)
                            .to(Referrals::Table, Referrals::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referral_transactions_subscription")
                            .from(
                                ReferralTransactions::Table,
                                ReferralTransactions::SubscriptionId,
                            )
                            .to(UserSubscriptions::Table, UserSubscriptions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_referral_transactions_user")
                    .table(ReferralTransactions::Table)
                    .col(ReferralTransactions::UserId)
                    .col(ReferralTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferralPointsLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralPointsLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReferralPointsLogs::SubscriptionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralPointsLogs::UserId).uuid().null())
                    .col(ColumnDef::new(ReferralPointsLogs::ReferralId).uuid().null())
                    .col(
                        ColumnDef::new(ReferralPointsLogs::Outcome)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReferralPointsLogs::Reason)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReferralPointsLogs::Detail).text().null())
                    .col(
                        ColumnDef::new(ReferralPointsLogs::Points)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReferralPointsLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_referral_points_logs_subscription")
                    .table(ReferralPointsLogs::Table)
                    .col(ReferralPointsLogs::SubscriptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferralPointsLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReferralTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserReferralPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Referrals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Referrals {
    Table,
    Id,
    ReferrerId,
    ReferredId,
    Status,
    PointsAwarded,
    SubscriptionTierId,
    CompletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserReferralPoints {
    Table,
    Id,
    UserId,
    PointsBalance,
    TotalEarned,
    TotalRedeemed,
    SuccessfulReferrals,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReferralTransactions {
    Table,
    Id,
    UserId,
    TransactionType,
    Points,
    BalanceAfter,
    ReferralId,
    SubscriptionId,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ReferralPointsLogs {
    Table,
    Id,
    SubscriptionId,
    UserId,
    ReferralId,
    Outcome,
    Reason,
    Detail,
    Points,
    CreatedAt,
}
