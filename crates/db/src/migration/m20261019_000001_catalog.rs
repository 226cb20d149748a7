//! Migration to create the catalog tables: `ai_models`, `subscription_tiers`,
//! `grades` and `subjects`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiModels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AiModels::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AiModels::Provider).string_len(50).not_null())
                    .col(
                        ColumnDef::new(AiModels::ModelName)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AiModels::DisplayName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AiModels::SupportsVision)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AiModels::SupportsStreaming)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(AiModels::MaxContextTokens).integer().null())
                    .col(
                        ColumnDef::new(AiModels::InputPricePerMillion)
                            .decimal_len(12, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AiModels::OutputPricePerMillion)
                            .decimal_len(12, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AiModels::TokenMultiplier)
                            .decimal_len(6, 3)
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(AiModels::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AiModels::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AiModels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AiModels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubscriptionTiers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionTiers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::Name)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::DisplayName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubscriptionTiers::Description).text().null())
                    .col(
                        ColumnDef::new(SubscriptionTiers::TokenLimit)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::MaxSubjects)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::CanSelectGrade)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::CanSelectSubjects)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::ReferralPointsAwarded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::PointsCost)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SubscriptionTiers::AiModelId).uuid().null())
                    .col(
                        ColumnDef::new(SubscriptionTiers::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTiers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_tiers_ai_model")
                            .from(SubscriptionTiers::Table, SubscriptionTiers::AiModelId)
                            .to(AiModels::Table, AiModels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Grades::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Grades::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Grades::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Grades::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Grades::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Grades::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subjects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Subjects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Subjects::GradeId).uuid().null())
                    .col(ColumnDef::new(Subjects::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Subjects::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Subjects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subjects_grade")
                            .from(Subjects::Table, Subjects::GradeId)
                            .to(Grades::Table, Grades::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subjects_grade")
                    .table(Subjects::Table)
                    .col(Subjects::GradeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subjects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Grades::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubscriptionTiers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AiModels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(super) enum AiModels {
    Table,
    Id,
    Provider,
    ModelName,
    DisplayName,
    SupportsVision,
    SupportsStreaming,
    MaxContextTokens,
    InputPricePerMillion,
    OutputPricePerMillion,
    TokenMultiplier,
    IsDefault,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(super) enum SubscriptionTiers {
    Table,
    Id,
    Name,
    DisplayName,
    Description,
    TokenLimit,
    MaxSubjects,
    CanSelectGrade,
    CanSelectSubjects,
    ReferralPointsAwarded,
    PointsCost,
    AiModelId,
    SortOrder,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(super) enum Grades {
    Table,
    Id,
    Name,
    SortOrder,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(super) enum Subjects {
    Table,
    Id,
    GradeId,
    Name,
    IsActive,
    CreatedAt,
}
