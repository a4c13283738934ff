use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;
use crate::error::{AppError, AppResult};
use crate::store::InventorySnapshot;

/// 奖品
/// 概念说明:
/// - remaining_quantity: 剩余库存，只减不增（管理端 reset_quantity 除外）
/// - daily_limit / daily_count: 每日发放上限与当日已发放数量
/// - win_probability: 自身中奖率 (0..=1)，为空时回退到地点有效默认值
/// - version: 库存乐观锁版本号，与存储层一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub location_id: i64,
    pub status: Status,
    pub points: i64,
    pub points_required: Option<i64>,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
    pub daily_limit: Option<i64>,
    pub daily_count: i64,
    pub win_probability: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Reward {
    pub fn new(
        id: i64,
        code: &str,
        location_id: i64,
        total_quantity: i64,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> AppResult<Self> {
        if total_quantity < 0 {
            return Err(AppError::ValidationError(
                "Reward quantity cannot be negative".into(),
            ));
        }
        Ok(Self {
            id,
            code: code.to_uppercase(),
            name: code.to_string(),
            location_id,
            status: Status::active(),
            points: 0,
            points_required: None,
            total_quantity,
            remaining_quantity: total_quantity,
            daily_limit: None,
            daily_count: 0,
            win_probability: None,
            valid_from: Some(valid_from),
            valid_until: Some(valid_until),
            version: 0,
        })
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.win_probability = Some(probability);
        self
    }

    pub fn with_points(mut self, points: i64) -> Self {
        self.points = points;
        self
    }

    pub fn with_daily_limit(mut self, limit: i64) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn has_available_quantity(&self) -> bool {
        self.remaining_quantity > 0
    }

    /// 积分与所需积分都不能为负
    pub fn validate_points(&self) -> AppResult<()> {
        if self.points < 0 || self.points_required.is_some_and(|p| p < 0) {
            return Err(AppError::ValidationError(format!(
                "Reward {} points cannot be negative",
                self.code
            )));
        }
        Ok(())
    }

    pub fn is_under_daily_limit(&self) -> bool {
        match self.daily_limit {
            None => true,
            Some(limit) => self.daily_count < limit,
        }
    }

    /// 用存储层最新计数覆盖本地副本
    pub fn apply_inventory(&mut self, snapshot: &InventorySnapshot) {
        self.total_quantity = snapshot.total_quantity;
        self.remaining_quantity = snapshot.remaining_quantity;
        self.daily_limit = snapshot.daily_limit;
        self.daily_count = snapshot.daily_count;
        self.version = snapshot.version;
    }

    pub fn inventory(&self) -> InventorySnapshot {
        InventorySnapshot {
            reward_id: self.id,
            total_quantity: self.total_quantity,
            remaining_quantity: self.remaining_quantity,
            daily_limit: self.daily_limit,
            daily_count: self.daily_count,
            version: self.version,
        }
    }
}
