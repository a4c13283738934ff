use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 抽奖记录实体
/// 说明:
/// - id 为 uuid 文本
/// - reward_id 未中奖时为空
/// - status: 1 有效 / 0 已取消
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "spin_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub participant_event_id: i64,
    pub location_id: i64,
    pub reward_id: Option<i64>,
    pub golden_hour_id: Option<i64>,
    pub win: bool,
    pub points_earned: i64,
    pub points_spent: i64,
    pub finalized: bool,
    pub status: i16,
    pub spun_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
