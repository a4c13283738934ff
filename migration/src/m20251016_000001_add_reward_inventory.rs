use sea_orm_migration::prelude::*;

/// Reward inventory counters (奖品库存计数)
#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    TotalQuantity,
    RemainingQuantity,
    DailyLimit,
    DailyCount,
    Version,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 这里只保存抽奖引擎写入的计数，以奖品 id 为主键；
/// 奖品名称、地点、中奖率、有效期等配置归管理端维护
///
/// 每次条件写入 `version` +1，作为库存提交的乐观锁版本号
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rewards::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Rewards::TotalQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rewards::RemainingQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rewards::DailyLimit)
                            .big_integer()
                            .null(), // NULL = 不限每日发放
                    )
                    .col(
                        ColumnDef::new(Rewards::DailyCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rewards::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rewards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Rewards::Table).to_owned())
            .await?;
        Ok(())
    }
}
