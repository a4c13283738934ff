use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Status;
use crate::error::{AppError, AppResult};

/// 活动/地点的抽奖默认配置。任一字段为空表示"未配置"，由上级回退
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpinSettings {
    pub initial_spins: Option<i64>,
    pub daily_spin_limit: Option<i64>,
    pub default_win_probability: Option<f64>,
}

impl SpinSettings {
    /// 新建活动时的标准默认值: 10 次初始、每日 5 次、10% 中奖率
    pub const STANDARD: SpinSettings = SpinSettings {
        initial_spins: Some(10),
        daily_spin_limit: Some(5),
        default_win_probability: Some(0.1),
    };

    /// 全部未配置，地点默认不覆盖活动配置
    pub const UNSET: SpinSettings = SpinSettings {
        initial_spins: None,
        daily_spin_limit: None,
        default_win_probability: None,
    };

    /// 逐字段覆盖: `self` 已设置的字段优先，其余取 `fallback`
    pub fn or(self, fallback: SpinSettings) -> SpinSettings {
        SpinSettings {
            initial_spins: self.initial_spins.or(fallback.initial_spins),
            daily_spin_limit: self.daily_spin_limit.or(fallback.daily_spin_limit),
            default_win_probability: self
                .default_win_probability
                .or(fallback.default_win_probability),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if matches!(self.initial_spins, Some(n) if n < 0) {
            return Err(AppError::ValidationError(
                "Initial spins cannot be negative".into(),
            ));
        }
        if matches!(self.daily_spin_limit, Some(n) if n < 0) {
            return Err(AppError::ValidationError(
                "Daily spin limit cannot be negative".into(),
            ));
        }
        if let Some(p) = self.default_win_probability
            && !(0.0..=1.0).contains(&p)
        {
            return Err(AppError::ValidationError(
                "Win probability must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

/// 活动（时间窗口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignWindow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub settings: SpinSettings,
}

impl CampaignWindow {
    pub fn new(
        id: i64,
        code: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        settings: SpinSettings,
    ) -> AppResult<Self> {
        if end_time < start_time {
            return Err(AppError::ValidationError(
                "Event end time must not be before start time".into(),
            ));
        }
        settings.validate()?;
        Ok(Self {
            id,
            code: code.to_uppercase(),
            name: code.to_string(),
            status: Status::active(),
            start_time: Some(start_time),
            end_time: Some(end_time),
            settings,
        })
    }
}

/// 活动地点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Status,
    pub window_id: i64,
    /// None = 未划定区域（不参与省份重叠校验）
    pub region_id: Option<i64>,
    pub overrides: SpinSettings,
}

impl Location {
    pub fn new(id: i64, code: &str, window_id: i64, region_id: Option<i64>) -> Self {
        Self {
            id,
            code: code.to_uppercase(),
            name: code.to_string(),
            status: Status::active(),
            window_id,
            region_id,
            overrides: SpinSettings::UNSET,
        }
    }

    pub fn with_overrides(mut self, overrides: SpinSettings) -> AppResult<Self> {
        overrides.validate()?;
        self.overrides = overrides;
        Ok(self)
    }
}

/// 区域，拥有一组省份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Status,
    pub default_win_probability: Option<f64>,
    pub province_ids: BTreeSet<i64>,
}

impl Region {
    pub fn new(id: i64, code: &str, province_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            id,
            code: code.to_uppercase(),
            name: code.to_string(),
            status: Status::active(),
            default_win_probability: None,
            province_ids: province_ids.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Status,
}

impl Province {
    pub fn new(id: i64, code: &str, name: &str) -> Self {
        Self {
            id,
            code: code.to_uppercase(),
            name: name.to_string(),
            status: Status::active(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Status,
}

impl Participant {
    pub fn new(id: i64, code: &str, name: &str) -> Self {
        Self {
            id,
            code: code.to_string(),
            name: name.to_string(),
            status: Status::active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_settings_fallback() {
        let overrides = SpinSettings {
            initial_spins: Some(3),
            ..SpinSettings::UNSET
        };
        let effective = overrides.or(SpinSettings::STANDARD);
        assert_eq!(effective.initial_spins, Some(3));
        assert_eq!(effective.daily_spin_limit, Some(5));
        assert_eq!(effective.default_win_probability, Some(0.1));

        let both_unset = SpinSettings::UNSET.or(SpinSettings::UNSET);
        assert_eq!(both_unset, SpinSettings::UNSET);
    }

    #[test]
    fn test_settings_validation() {
        assert!(SpinSettings::STANDARD.validate().is_ok());
        let bad = SpinSettings {
            default_win_probability: Some(1.5),
            ..SpinSettings::UNSET
        };
        assert!(bad.validate().is_err());
        let bad = SpinSettings {
            initial_spins: Some(-1),
            ..SpinSettings::UNSET
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_window_rejects_inverted_schedule() {
        let now = Utc::now();
        let err = CampaignWindow::new(1, "e1", now, now - Duration::hours(1), SpinSettings::STANDARD)
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let window = CampaignWindow::new(1, "e1", now, now, SpinSettings::STANDARD).unwrap();
        assert_eq!(window.code, "E1");
    }
}
