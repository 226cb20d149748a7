//! Migration to create `payment_transactions`, `user_subscriptions`,
//! `token_usage_logs` and `user_ai_preferences`.

use sea_orm_migration::prelude::*;

use super::m20261019_000001_catalog::{AiModels, Grades, SubscriptionTiers};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentTransactions::UserId).uuid().not_null())
                    // No foreign key: a payment keeps its tier id after the tier is retired
                    .col(ColumnDef::new(PaymentTransactions::TierId).uuid().not_null())
                    .col(
                        ColumnDef::new(PaymentTransactions::BillingCycle)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::PaymentProvider)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::PaymentMethodId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::SelectedGradeId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::SelectedSubjectIds)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::FailureReason)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::UpdatedAt)
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
                    .name("idx_payment_transactions_user")
                    .table(PaymentTransactions::Table)
                    .col(PaymentTransactions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSubscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSubscriptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserSubscriptions::TierId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserSubscriptions::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::BillingCycle)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::PeriodStartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::PeriodEndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::TokenLimitOverride)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::TokensUsedCurrentPeriod)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::PapersAccessedCurrentPeriod)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::AccessedPaperIds)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::SelectedGradeId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::SelectedSubjectIds)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::PaymentProvider)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::LastPaymentId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserSubscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_subscriptions_tier")
                            .from(UserSubscriptions::Table, UserSubscriptions::TierId)
                            .to(SubscriptionTiers::Table, SubscriptionTiers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_subscriptions_grade")
                            .from(UserSubscriptions::Table, UserSubscriptions::SelectedGradeId)
                            .to(Grades::Table, Grades::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Expiry sweeps scan active rows by period end
        manager
            .create_index(
                Index::create()
                    .name("idx_user_subscriptions_status_period_end")
                    .table(UserSubscriptions::Table)
                    .col(UserSubscriptions::Status)
                    .col(UserSubscriptions::PeriodEndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TokenUsageLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TokenUsageLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TokenUsageLogs::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(TokenUsageLogs::SubscriptionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TokenUsageLogs::AiModelId).uuid().null())
                    .col(
                        ColumnDef::new(TokenUsageLogs::Tokens)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TokenUsageLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_token_usage_logs_subscription")
                            .from(TokenUsageLogs::Table, TokenUsageLogs::SubscriptionId)
                            .to(UserSubscriptions::Table, UserSubscriptions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_token_usage_logs_ai_model")
                            .from(TokenUsageLogs::Table, TokenUsageLogs::AiModelId)
                            .to(AiModels::Table, AiModels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_token_usage_logs_user")
                    .table(TokenUsageLogs::Table)
                    .col(TokenUsageLogs::UserId)
                    .col(TokenUsageLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserAiPreferences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserAiPreferences::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserAiPreferences::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(UserAiPreferences::AiModelId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserAiPreferences::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(UserAiPreferences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserAiPreferences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_ai_preferences_model")
                            .from(UserAiPreferences::Table, UserAiPreferences::AiModelId)
                            .to(AiModels::Table, AiModels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAiPreferences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TokenUsageLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSubscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PaymentTransactions {
    Table,
    Id,
    UserId,
    TierId,
    BillingCycle,
    Status,
    PaymentProvider,
    PaymentMethodId,
    SelectedGradeId,
    SelectedSubjectIds,
    FailureReason,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(super) enum UserSubscriptions {
    Table,
    Id,
    UserId,
    TierId,
    Status,
    BillingCycle,
    PeriodStartDate,
    PeriodEndDate,
    TokenLimitOverride,
    TokensUsedCurrentPeriod,
    PapersAccessedCurrentPeriod,
    AccessedPaperIds,
    SelectedGradeId,
    SelectedSubjectIds,
    PaymentProvider,
    LastPaymentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TokenUsageLogs {
    Table,
    Id,
    UserId,
    SubscriptionId,
    AiModelId,
    Tokens,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserAiPreferences {
    Table,
    Id,
    UserId,
    AiModelId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
