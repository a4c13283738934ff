//! 测试公用数据: 一个活动、一个地点、一个区域、一个参与者，均在 [`now`] 前后有效

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{
    CampaignCatalog, CampaignWindow, GoldenHour, Location, Participant, ParticipantEvent,
    Province, Region, Reward, SpinSettings,
};

pub const WINDOW_ID: i64 = 1;
pub const REGION_ID: i64 = 1;
pub const LOCATION_ID: i64 = 10;
pub const PARTICIPANT_ID: i64 = 100;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn campaign() -> CampaignCatalog {
    let now = now();
    let mut catalog = CampaignCatalog::new();
    catalog.insert_window(
        CampaignWindow::new(
            WINDOW_ID,
            "summer",
            now - Duration::days(30),
            now + Duration::days(30),
            SpinSettings::STANDARD,
        )
        .unwrap(),
    );
    for (id, code) in [(1, "on"), (2, "qc"), (3, "bc")] {
        catalog.insert_province(Province::new(id, code, code));
    }
    catalog
        .insert_region(Region::new(REGION_ID, "east", [1, 2]))
        .unwrap();
    catalog
        .attach_location(Location::new(LOCATION_ID, "mall", WINDOW_ID, Some(REGION_ID)))
        .unwrap();
    catalog.insert_participant(Participant::new(PARTICIPANT_ID, "p-100", "Alice"));
    catalog
}

/// 有效期覆盖 [`now`] 前后一天的奖品
pub fn reward(id: i64, location_id: i64, probability: f64, quantity: i64) -> Reward {
    let now = now();
    Reward::new(
        id,
        &format!("r{id}"),
        location_id,
        quantity,
        now - Duration::days(1),
        now + Duration::days(1),
    )
    .unwrap()
    .with_probability(probability)
}

/// 覆盖 [`now`] 前后一小时的黄金时段
pub fn golden_hour(id: i64, location_id: i64, multiplier: f64) -> GoldenHour {
    let now = now();
    GoldenHour::new(
        id,
        &format!("gh{id}"),
        location_id,
        now - Duration::hours(1),
        now + Duration::hours(1),
        multiplier,
    )
    .unwrap()
}

/// 把参与者加入默认地点并返回账本 id
pub fn joined(catalog: &mut CampaignCatalog, spins: i64) -> i64 {
    let id = catalog.next_participant_event_id();
    catalog.put_participant_event(
        ParticipantEvent::new(id, PARTICIPANT_ID, LOCATION_ID, spins).unwrap(),
    );
    id
}
