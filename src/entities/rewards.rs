use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 奖品库存计数实体
/// 说明:
/// - remaining_quantity: 剩余库存，只减不增（除 reset_quantity）
/// - daily_count: 当日已发放数量，每日重置
/// - version: 乐观锁版本号，每次条件更新 +1
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
    /// 每日发放上限 (NULL=不限)
    pub daily_limit: Option<i64>,
    pub daily_count: i64,
    pub version: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
