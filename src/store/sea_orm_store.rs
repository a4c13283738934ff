use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, UpdateResult,
};
use uuid::Uuid;

use super::{
    CommitOutcome, InventorySnapshot, ParticipantCounters, ParticipantLedgerStore,
    RewardInventory,
};
use crate::entities::{
    participant_event_entity as ledgers, reward_entity as rewards,
    spin_history_entity as histories,
};
use crate::error::{AppError, AppResult};
use crate::models::{SpinHistory, Status, StatusCode};

impl From<rewards::Model> for InventorySnapshot {
    fn from(m: rewards::Model) -> Self {
        Self {
            reward_id: m.id,
            total_quantity: m.total_quantity,
            remaining_quantity: m.remaining_quantity,
            daily_limit: m.daily_limit,
            daily_count: m.daily_count,
            version: m.version,
        }
    }
}

impl TryFrom<ledgers::Model> for ParticipantCounters {
    type Error = AppError;

    fn try_from(m: ledgers::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            participant_id: m.participant_id,
            location_id: m.location_id,
            status: StatusCode::try_from(m.status)?,
            initial_spins: m.initial_spins,
            remaining_spins: m.remaining_spins,
            total_spins: m.total_spins,
            daily_spins_used: m.daily_spins_used,
            win_count: m.win_count,
            total_points: m.total_points,
            version: m.version,
        })
    }
}

impl TryFrom<histories::Model> for SpinHistory {
    type Error = AppError;

    fn try_from(m: histories::Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&m.id)
            .map_err(|e| AppError::InternalError(format!("Invalid spin id {}: {e}", m.id)))?;
        Ok(Self {
            id,
            participant_event_id: m.participant_event_id,
            location_id: m.location_id,
            reward_id: m.reward_id,
            golden_hour_id: m.golden_hour_id,
            win: m.win,
            points_earned: m.points_earned,
            points_spent: m.points_spent,
            spun_at: m.spun_at,
            finalized: m.finalized,
            status: Status {
                code: StatusCode::try_from(m.status)?,
                activated_at: None,
                deactivated_at: None,
            },
        })
    }
}

async fn find_reward<C: ConnectionTrait>(conn: &C, reward_id: i64) -> AppResult<rewards::Model> {
    rewards::Entity::find_by_id(reward_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id}")))
}

/// 基于 sea-orm 的库存计数存储
#[derive(Clone)]
pub struct SeaOrmRewardInventory {
    pool: DatabaseConnection,
}

impl SeaOrmRewardInventory {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardInventory for SeaOrmRewardInventory {
    async fn load(&self, reward_id: i64) -> AppResult<Option<InventorySnapshot>> {
        let row = rewards::Entity::find_by_id(reward_id).one(&self.pool).await?;
        Ok(row.map(InventorySnapshot::from))
    }

    async fn upsert(&self, snapshot: InventorySnapshot) -> AppResult<()> {
        let am = rewards::ActiveModel {
            id: Set(snapshot.reward_id),
            total_quantity: Set(snapshot.total_quantity),
            remaining_quantity: Set(snapshot.remaining_quantity),
            daily_limit: Set(snapshot.daily_limit),
            daily_count: Set(snapshot.daily_count),
            version: Set(snapshot.version),
            updated_at: Set(Some(Utc::now())),
        };

        let exists = rewards::Entity::find_by_id(snapshot.reward_id)
            .one(&self.pool)
            .await?
            .is_some();
        if exists {
            am.update(&self.pool).await?;
        } else {
            rewards::Entity::insert(am)
                .exec_without_returning(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn compare_and_commit(
        &self,
        reward_id: i64,
        expected_version: i64,
    ) -> AppResult<CommitOutcome> {
        // 扣减与回读在同一事务内，回读结果只包含本次扣减
        let txn = self.pool.begin().await?;

        // 条件扣减: 版本号一致 且 有库存 且 未达每日上限
        let update_result: UpdateResult = rewards::Entity::update_many()
            .col_expr(
                rewards::Column::RemainingQuantity,
                Expr::col(rewards::Column::RemainingQuantity).sub(1),
            )
            .col_expr(
                rewards::Column::DailyCount,
                Expr::col(rewards::Column::DailyCount).add(1),
            )
            .col_expr(
                rewards::Column::Version,
                Expr::col(rewards::Column::Version).add(1),
            )
            .col_expr(rewards::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(rewards::Column::Id.eq(reward_id))
            .filter(rewards::Column::Version.eq(expected_version))
            .filter(rewards::Column::RemainingQuantity.gt(0))
            .filter(
                Condition::any()
                    .add(rewards::Column::DailyLimit.is_null())
                    .add(
                        Expr::col(rewards::Column::DailyCount)
                            .lt(Expr::col(rewards::Column::DailyLimit)),
                    ),
            )
            .exec(&txn)
            .await?;

        let current = find_reward(&txn, reward_id).await?;
        txn.commit().await?;
        if update_result.rows_affected == 1 {
            return Ok(CommitOutcome::Committed(current.into()));
        }

        // 未命中: 区分版本冲突与库存耗尽
        if current.version != expected_version {
            Ok(CommitOutcome::Conflict)
        } else {
            Ok(CommitOutcome::Depleted)
        }
    }

    async fn reset_daily(&self, reward_id: i64) -> AppResult<InventorySnapshot> {
        let update_result = rewards::Entity::update_many()
            .col_expr(rewards::Column::DailyCount, Expr::value(0i64))
            .col_expr(
                rewards::Column::Version,
                Expr::col(rewards::Column::Version).add(1),
            )
            .col_expr(rewards::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(rewards::Column::Id.eq(reward_id))
            .exec(&self.pool)
            .await?;
        if update_result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Reward {reward_id}")));
        }
        Ok(find_reward(&self.pool, reward_id).await?.into())
    }

    async fn reset_quantity(&self, reward_id: i64) -> AppResult<InventorySnapshot> {
        let update_result = rewards::Entity::update_many()
            .col_expr(
                rewards::Column::RemainingQuantity,
                Expr::col(rewards::Column::TotalQuantity).into(),
            )
            .col_expr(
                rewards::Column::Version,
                Expr::col(rewards::Column::Version).add(1),
            )
            .col_expr(rewards::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(rewards::Column::Id.eq(reward_id))
            .exec(&self.pool)
            .await?;
        if update_result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Reward {reward_id}")));
        }
        Ok(find_reward(&self.pool, reward_id).await?.into())
    }

    async fn reset_all_daily(&self) -> AppResult<u64> {
        let update_result = rewards::Entity::update_many()
            .col_expr(rewards::Column::DailyCount, Expr::value(0i64))
            .col_expr(
                rewards::Column::Version,
                Expr::col(rewards::Column::Version).add(1),
            )
            .col_expr(rewards::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .exec(&self.pool)
            .await?;
        log::info!("Reset daily count of {} rewards", update_result.rows_affected);
        Ok(update_result.rows_affected)
    }
}

/// 按版本号条件覆盖账本计数
async fn save_counters<C: ConnectionTrait>(
    conn: &C,
    counters: ParticipantCounters,
    expected_version: i64,
) -> AppResult<bool> {
    let status: i16 = counters.status.into();
    let update_result = ledgers::Entity::update_many()
        .col_expr(ledgers::Column::Status, Expr::value(status))
        .col_expr(
            ledgers::Column::InitialSpins,
            Expr::value(counters.initial_spins),
        )
        .col_expr(
            ledgers::Column::RemainingSpins,
            Expr::value(counters.remaining_spins),
        )
        .col_expr(ledgers::Column::TotalSpins, Expr::value(counters.total_spins))
        .col_expr(
            ledgers::Column::DailySpinsUsed,
            Expr::value(counters.daily_spins_used),
        )
        .col_expr(ledgers::Column::WinCount, Expr::value(counters.win_count))
        .col_expr(
            ledgers::Column::TotalPoints,
            Expr::value(counters.total_points),
        )
        .col_expr(ledgers::Column::Version, Expr::value(counters.version))
        .col_expr(ledgers::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(ledgers::Column::Id.eq(counters.id))
        .filter(ledgers::Column::Version.eq(expected_version))
        .exec(conn)
        .await?;

    if update_result.rows_affected == 1 {
        return Ok(true);
    }
    let exists = ledgers::Entity::find_by_id(counters.id)
        .one(conn)
        .await?
        .is_some();
    if !exists {
        return Err(AppError::NotFound(format!(
            "ParticipantEvent {}",
            counters.id
        )));
    }
    Ok(false)
}

/// 基于 sea-orm 的参与者账本存储
#[derive(Clone)]
pub struct SeaOrmParticipantLedger {
    pool: DatabaseConnection,
}

impl SeaOrmParticipantLedger {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantLedgerStore for SeaOrmParticipantLedger {
    async fn load(&self, id: i64) -> AppResult<Option<ParticipantCounters>> {
        ledgers::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(ParticipantCounters::try_from)
            .transpose()
    }

    async fn insert(&self, counters: ParticipantCounters) -> AppResult<()> {
        let existing = ledgers::Entity::find()
            .filter(
                Condition::any().add(ledgers::Column::Id.eq(counters.id)).add(
                    Condition::all()
                        .add(ledgers::Column::ParticipantId.eq(counters.participant_id))
                        .add(ledgers::Column::LocationId.eq(counters.location_id)),
                ),
            )
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(format!(
                "Participant {} already joined location {}",
                counters.participant_id, counters.location_id
            )));
        }

        let am = ledgers::ActiveModel {
            id: Set(counters.id),
            participant_id: Set(counters.participant_id),
            location_id: Set(counters.location_id),
            status: Set(counters.status.into()),
            initial_spins: Set(counters.initial_spins),
            remaining_spins: Set(counters.remaining_spins),
            total_spins: Set(counters.total_spins),
            daily_spins_used: Set(counters.daily_spins_used),
            win_count: Set(counters.win_count),
            total_points: Set(counters.total_points),
            version: Set(counters.version),
            updated_at: Set(Some(Utc::now())),
        };
        ledgers::Entity::insert(am)
            .exec_without_returning(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_if_version(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
    ) -> AppResult<bool> {
        save_counters(&self.pool, counters, expected_version).await
    }

    async fn commit_spin(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
        history: &SpinHistory,
    ) -> AppResult<bool> {
        let txn = self.pool.begin().await?;
        if !save_counters(&txn, counters, expected_version).await? {
            txn.rollback().await?;
            return Ok(false);
        }

        let am = histories::ActiveModel {
            id: Set(history.id.to_string()),
            participant_event_id: Set(history.participant_event_id),
            location_id: Set(history.location_id),
            reward_id: Set(history.reward_id),
            golden_hour_id: Set(history.golden_hour_id),
            win: Set(history.win),
            points_earned: Set(history.points_earned),
            points_spent: Set(history.points_spent),
            finalized: Set(history.finalized),
            status: Set(history.status.code.into()),
            spun_at: Set(history.spun_at),
            created_at: Set(Some(Utc::now())),
        };
        histories::Entity::insert(am)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn load_history(&self, participant_event_id: i64) -> AppResult<Vec<SpinHistory>> {
        histories::Entity::find()
            .filter(histories::Column::ParticipantEventId.eq(participant_event_id))
            .order_by_asc(histories::Column::SpunAt)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(SpinHistory::try_from)
            .collect()
    }

    async fn reset_all_daily(&self) -> AppResult<u64> {
        let update_result = ledgers::Entity::update_many()
            .col_expr(ledgers::Column::DailySpinsUsed, Expr::value(0i64))
            .col_expr(
                ledgers::Column::Version,
                Expr::col(ledgers::Column::Version).add(1),
            )
            .col_expr(ledgers::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .exec(&self.pool)
            .await?;
        log::info!(
            "Reset daily spins of {} participant events",
            update_result.rows_affected
        );
        Ok(update_result.rows_affected)
    }
}
