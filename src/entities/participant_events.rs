use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 参与者抽奖账本实体
/// 说明:
/// - remaining_spins: 剩余抽奖次数，不可为负
/// - daily_spins_used: 当日已用次数，每日重置
/// - status: 1 启用 / 0 停用 / -1 删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "participant_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub participant_id: i64,
    pub location_id: i64,
    pub status: i16,
    pub initial_spins: i64,
    pub remaining_spins: i64,
    pub total_spins: i64,
    pub daily_spins_used: i64,
    pub win_count: i64,
    pub total_points: i64,
    pub version: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
