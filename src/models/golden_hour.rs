use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;
use crate::error::{AppError, AppResult};

pub const DEFAULT_MULTIPLIER: f64 = 1.0;

/// 黄金时段：在时间窗口内提升某地点的中奖率与积分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenHour {
    pub id: i64,
    pub code: String,
    pub location_id: i64,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub win_probability_multiplier: f64,
    pub points_multiplier: f64,
    /// 每日可用次数上限 (None = 不限)
    pub daily_limit: Option<i64>,
    pub total_uses: i64,
}

impl GoldenHour {
    pub fn new(
        id: i64,
        code: &str,
        location_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        win_probability_multiplier: f64,
    ) -> AppResult<Self> {
        if end_time < start_time {
            return Err(AppError::ValidationError(
                "Golden hour end time must not be before start time".into(),
            ));
        }
        Ok(Self {
            id,
            code: code.to_uppercase(),
            location_id,
            status: Status::active(),
            start_time: Some(start_time),
            end_time: Some(end_time),
            win_probability_multiplier,
            points_multiplier: DEFAULT_MULTIPLIER,
            daily_limit: None,
            total_uses: 0,
        })
    }

    pub fn is_within_usage_limit(&self) -> bool {
        match self.daily_limit {
            None => true,
            Some(limit) => self.total_uses < limit,
        }
    }

    /// 时段内中奖所得积分 = floor(base × 积分倍率)
    /// 倍率非有限或为负时按原积分发放
    pub fn apply_points(&self, base: i64) -> i64 {
        let m = self.points_multiplier;
        if !m.is_finite() || m < 0.0 {
            return base;
        }
        let boosted = (base as f64 * m).floor();
        if boosted >= i64::MAX as f64 {
            i64::MAX
        } else {
            boosted as i64
        }
    }

    pub fn increment_uses(&mut self) {
        self.total_uses = self.total_uses.saturating_add(1);
    }

    pub fn reset_uses(&mut self) {
        self.total_uses = 0;
    }
}
