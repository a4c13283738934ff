use sea_orm_migration::prelude::*;

/// 抽奖记录 (每次抽奖一条，结算后不再修改)
#[derive(DeriveIden)]
enum SpinHistories {
    Table,
    Id,
    ParticipantEventId,
    LocationId,
    RewardId,
    GoldenHourId,
    Win,
    PointsEarned,
    PointsSpent,
    Finalized,
    Status,
    SpunAt,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpinHistories::Table)
                    .if_not_exists()
                    // uuid 文本形式
                    .col(
                        ColumnDef::new(SpinHistories::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::ParticipantEventId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::LocationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SpinHistories::RewardId).big_integer().null())
                    .col(
                        ColumnDef::new(SpinHistories::GoldenHourId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::Win)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::PointsEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::PointsSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::Finalized)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // 1 = active, 0 = cancelled
                    .col(
                        ColumnDef::new(SpinHistories::Status)
                            .small_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::SpunAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SpinHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_spin_histories_participant_event")
                    .table(SpinHistories::Table)
                    .col(SpinHistories::ParticipantEventId)
                    .col(SpinHistories::SpunAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(SpinHistories::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
