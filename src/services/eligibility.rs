//! 实体当前是否可用的判定
//!
//! 判定是纯函数：只读目录与传入的时间点，返回 [`Eligibility`]。
//! 上级实体不可用时，下级实体一定不可用。

use chrono::{DateTime, Utc};

use crate::models::{
    CampaignCatalog, CampaignWindow, Eligibility, GoldenHour, InactiveReason, Location,
    Participant, ParticipantEvent, Region, Reward, Status,
};

pub trait Eligible {
    fn check(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility;

    fn is_active(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> bool {
        self.check(catalog, now).is_active()
    }
}

macro_rules! ensure {
    ($check:expr) => {
        if let Eligibility::Inactive(reason) = $check {
            return Eligibility::Inactive(reason);
        }
    };
}

fn own_status(status: &Status) -> Eligibility {
    if status.is_active() {
        Eligibility::Active
    } else {
        Eligibility::Inactive(InactiveReason::StatusNotActive)
    }
}

/// 闭区间 [start, end]；任一端缺失视为未配置
fn schedule(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Eligibility {
    match (start, end) {
        (Some(start), Some(end)) => {
            if now < start {
                Eligibility::Inactive(InactiveReason::NotStarted)
            } else if now > end {
                Eligibility::Inactive(InactiveReason::Ended)
            } else {
                Eligibility::Active
            }
        }
        _ => Eligibility::Inactive(InactiveReason::MissingSchedule),
    }
}

/// 上级实体检查，把上级的失败统一映射为 `reason`
fn ancestor<T: Eligible>(
    found: Option<&T>,
    catalog: &CampaignCatalog,
    now: DateTime<Utc>,
    reason: InactiveReason,
) -> Eligibility {
    match found {
        None => Eligibility::Inactive(InactiveReason::MissingReference),
        Some(parent) if parent.is_active(catalog, now) => Eligibility::Active,
        Some(_) => Eligibility::Inactive(reason),
    }
}

fn location_of(catalog: &CampaignCatalog, location_id: i64, now: DateTime<Utc>) -> Eligibility {
    ancestor(
        catalog.location(location_id).ok(),
        catalog,
        now,
        InactiveReason::LocationInactive,
    )
}

impl Eligible for CampaignWindow {
    fn check(&self, _catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility {
        ensure!(own_status(&self.status));
        schedule(self.start_time, self.end_time, now)
    }
}

impl Eligible for Region {
    fn check(&self, _catalog: &CampaignCatalog, _now: DateTime<Utc>) -> Eligibility {
        own_status(&self.status)
    }
}

impl Eligible for Participant {
    fn check(&self, _catalog: &CampaignCatalog, _now: DateTime<Utc>) -> Eligibility {
        own_status(&self.status)
    }
}

impl Eligible for Location {
    fn check(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility {
        ensure!(own_status(&self.status));
        ensure!(ancestor(
            catalog.window(self.window_id).ok(),
            catalog,
            now,
            InactiveReason::WindowInactive,
        ));
        // 未划定区域的地点不可用
        let region = self.region_id.and_then(|id| catalog.region(id).ok());
        ancestor(region, catalog, now, InactiveReason::RegionInactive)
    }
}

impl Eligible for Reward {
    fn check(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility {
        ensure!(own_status(&self.status));
        ensure!(location_of(catalog, self.location_id, now));
        if !self.has_available_quantity() {
            return Eligibility::Inactive(InactiveReason::OutOfStock);
        }
        ensure!(schedule(self.valid_from, self.valid_until, now));
        if !self.is_under_daily_limit() {
            return Eligibility::Inactive(InactiveReason::DailyLimitReached);
        }
        Eligibility::Active
    }
}

impl Eligible for GoldenHour {
    fn check(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility {
        ensure!(own_status(&self.status));
        ensure!(location_of(catalog, self.location_id, now));
        ensure!(schedule(self.start_time, self.end_time, now));
        if !self.is_within_usage_limit() {
            return Eligibility::Inactive(InactiveReason::UsageLimitReached);
        }
        Eligibility::Active
    }
}

impl Eligible for ParticipantEvent {
    fn check(&self, catalog: &CampaignCatalog, now: DateTime<Utc>) -> Eligibility {
        ensure!(own_status(&self.status));
        ensure!(ancestor(
            catalog.participant(self.participant_id).ok(),
            catalog,
            now,
            InactiveReason::ParticipantInactive,
        ));
        // 地点检查已包含所属活动
        location_of(catalog, self.location_id, now)
    }
}

/// 地点上当前可用的黄金时段，多个同时可用时取 id 最小者
pub fn find_usable_golden_hour(
    catalog: &CampaignCatalog,
    location_id: i64,
    now: DateTime<Utc>,
) -> Option<&GoldenHour> {
    catalog
        .golden_hours_at_location(location_id)
        .find(|gh| gh.is_active(catalog, now))
}
