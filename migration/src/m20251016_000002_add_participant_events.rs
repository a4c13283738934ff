use sea_orm_migration::prelude::*;

/// 参与者在活动地点的抽奖次数账本
#[derive(DeriveIden)]
enum ParticipantEvents {
    Table,
    Id,
    ParticipantId,
    LocationId,
    Status,
    InitialSpins,
    RemainingSpins,
    TotalSpins,
    DailySpinsUsed,
    WinCount,
    TotalPoints,
    Version,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParticipantEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParticipantEvents::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::ParticipantId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::LocationId)
                            .big_integer()
                            .not_null(),
                    )
                    // 1 = active, 0 = inactive, -1 = deleted
                    .col(
                        ColumnDef::new(ParticipantEvents::Status)
                            .small_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::InitialSpins)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::RemainingSpins)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::TotalSpins)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::DailySpinsUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::WinCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::TotalPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ParticipantEvents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个参与者在一个活动地点只有一条账本
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_participant_events_participant_location")
                    .table(ParticipantEvents::Table)
                    .col(ParticipantEvents::ParticipantId)
                    .col(ParticipantEvents::LocationId)
                    .unique()
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
                    .table(ParticipantEvents::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
