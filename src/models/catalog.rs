//! 一次抽奖所需的活动数据，按 id 存放
//!
//! 关系只单向保存: 地点记录所属活动与区域，区域记录省份，奖品与黄金时段记录所属地点。
//! 唯一的反向索引是 `window_locations`，由 [`CampaignCatalog::attach_location`]
//! 与 [`CampaignCatalog::detach_location`] 维护。

use std::collections::{BTreeMap, BTreeSet};

use super::{
    CampaignWindow, GoldenHour, Location, Participant, ParticipantEvent, Province, Region, Reward,
    SpinSettings,
};
use crate::error::{AppError, AppResult};
use crate::services::overlap::{OverlapCheck, OverlapValidator};

#[derive(Debug, Clone, Default)]
pub struct CampaignCatalog {
    windows: BTreeMap<i64, CampaignWindow>,
    locations: BTreeMap<i64, Location>,
    window_locations: BTreeMap<i64, BTreeSet<i64>>,
    regions: BTreeMap<i64, Region>,
    provinces: BTreeMap<i64, Province>,
    participants: BTreeMap<i64, Participant>,
    rewards: BTreeMap<i64, Reward>,
    golden_hours: BTreeMap<i64, GoldenHour>,
    participant_events: BTreeMap<i64, ParticipantEvent>,
}

fn not_found(kind: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{kind} {id}"))
}

impl CampaignCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------
    // 写入
    // -----------------------------

    pub fn insert_window(&mut self, window: CampaignWindow) {
        self.window_locations.entry(window.id).or_default();
        self.windows.insert(window.id, window);
    }

    pub fn insert_province(&mut self, province: Province) {
        self.provinces.insert(province.id, province);
    }

    /// 区域引用的省份必须已存在
    pub fn insert_region(&mut self, region: Region) -> AppResult<()> {
        if let Some(missing) = region
            .province_ids
            .iter()
            .find(|id| !self.provinces.contains_key(id))
        {
            return Err(AppError::ValidationError(format!(
                "Region {} references unknown province {missing}",
                region.code
            )));
        }
        self.regions.insert(region.id, region);
        Ok(())
    }

    pub fn insert_participant(&mut self, participant: Participant) {
        self.participants.insert(participant.id, participant);
    }

    /// 把地点挂到它的活动下；与同活动其它地点的省份重叠时拒绝
    pub fn attach_location(&mut self, location: Location) -> AppResult<()> {
        if !self.windows.contains_key(&location.window_id) {
            return Err(AppError::ValidationError(format!(
                "Location {} references unknown event {}",
                location.code, location.window_id
            )));
        }
        if let Some(region_id) = location.region_id
            && !self.regions.contains_key(&region_id)
        {
            return Err(AppError::ValidationError(format!(
                "Location {} references unknown region {region_id}",
                location.code
            )));
        }

        let check = OverlapValidator::check_no_overlap(
            self,
            &location,
            self.locations_of_window(location.window_id),
        );
        if let OverlapCheck::Conflict(other) = check {
            return Err(AppError::ValidationError(format!(
                "Event already has location {other} covering provinces of {}",
                location.code
            )));
        }

        self.window_locations
            .entry(location.window_id)
            .or_default()
            .insert(location.id);
        self.locations.insert(location.id, location);
        Ok(())
    }

    pub fn detach_location(&mut self, location_id: i64) -> AppResult<Location> {
        let location = self
            .locations
            .remove(&location_id)
            .ok_or_else(|| not_found("Location", location_id))?;
        if let Some(ids) = self.window_locations.get_mut(&location.window_id) {
            ids.remove(&location_id);
        }
        Ok(location)
    }

    /// 修改已挂载地点的区域，重新执行省份重叠校验
    pub fn assign_region(&mut self, location_id: i64, region_id: Option<i64>) -> AppResult<()> {
        if let Some(id) = region_id
            && !self.regions.contains_key(&id)
        {
            return Err(not_found("Region", id));
        }
        let mut candidate = self.location(location_id)?.clone();
        candidate.region_id = region_id;

        let check = OverlapValidator::check_no_overlap(
            self,
            &candidate,
            self.locations_of_window(candidate.window_id),
        );
        if let OverlapCheck::Conflict(other) = check {
            return Err(AppError::ValidationError(format!(
                "Region reassignment of location {} overlaps location {other}",
                candidate.code
            )));
        }

        self.locations.insert(location_id, candidate);
        Ok(())
    }

    pub fn insert_reward(&mut self, reward: Reward) -> AppResult<()> {
        if !self.locations.contains_key(&reward.location_id) {
            return Err(AppError::ValidationError(format!(
                "Reward {} references unknown location {}",
                reward.code, reward.location_id
            )));
        }
        reward.validate_points()?;
        self.rewards.insert(reward.id, reward);
        Ok(())
    }

    pub fn insert_golden_hour(&mut self, golden_hour: GoldenHour) -> AppResult<()> {
        if !self.locations.contains_key(&golden_hour.location_id) {
            return Err(AppError::ValidationError(format!(
                "Golden hour {} references unknown location {}",
                golden_hour.code, golden_hour.location_id
            )));
        }
        self.golden_hours.insert(golden_hour.id, golden_hour);
        Ok(())
    }

    pub fn put_participant_event(&mut self, participant_event: ParticipantEvent) {
        self.participant_events
            .insert(participant_event.id, participant_event);
    }

    pub fn remove_participant_event(&mut self, id: i64) -> Option<ParticipantEvent> {
        self.participant_events.remove(&id)
    }

    pub fn next_participant_event_id(&self) -> i64 {
        self.participant_events
            .keys()
            .next_back()
            .map(|id| id + 1)
            .unwrap_or(1)
    }

    // -----------------------------
    // 读取
    // -----------------------------

    pub fn window(&self, id: i64) -> AppResult<&CampaignWindow> {
        self.windows.get(&id).ok_or_else(|| not_found("Event", id))
    }

    pub fn window_mut(&mut self, id: i64) -> AppResult<&mut CampaignWindow> {
        self.windows.get_mut(&id).ok_or_else(|| not_found("Event", id))
    }

    pub fn location(&self, id: i64) -> AppResult<&Location> {
        self.locations.get(&id).ok_or_else(|| not_found("Location", id))
    }

    pub fn location_mut(&mut self, id: i64) -> AppResult<&mut Location> {
        self.locations
            .get_mut(&id)
            .ok_or_else(|| not_found("Location", id))
    }

    pub fn region(&self, id: i64) -> AppResult<&Region> {
        self.regions.get(&id).ok_or_else(|| not_found("Region", id))
    }

    pub fn region_mut(&mut self, id: i64) -> AppResult<&mut Region> {
        self.regions.get_mut(&id).ok_or_else(|| not_found("Region", id))
    }

    pub fn participant(&self, id: i64) -> AppResult<&Participant> {
        self.participants
            .get(&id)
            .ok_or_else(|| not_found("Participant", id))
    }

    pub fn participant_mut(&mut self, id: i64) -> AppResult<&mut Participant> {
        self.participants
            .get_mut(&id)
            .ok_or_else(|| not_found("Participant", id))
    }

    pub fn reward(&self, id: i64) -> AppResult<&Reward> {
        self.rewards.get(&id).ok_or_else(|| not_found("Reward", id))
    }

    pub fn reward_mut(&mut self, id: i64) -> AppResult<&mut Reward> {
        self.rewards.get_mut(&id).ok_or_else(|| not_found("Reward", id))
    }

    pub fn rewards(&self) -> impl Iterator<Item = &Reward> {
        self.rewards.values()
    }

    pub fn rewards_mut(&mut self) -> impl Iterator<Item = &mut Reward> {
        self.rewards.values_mut()
    }

    pub fn golden_hour(&self, id: i64) -> AppResult<&GoldenHour> {
        self.golden_hours
            .get(&id)
            .ok_or_else(|| not_found("GoldenHour", id))
    }

    pub fn golden_hour_mut(&mut self, id: i64) -> AppResult<&mut GoldenHour> {
        self.golden_hours
            .get_mut(&id)
            .ok_or_else(|| not_found("GoldenHour", id))
    }

    pub fn golden_hours_mut(&mut self) -> impl Iterator<Item = &mut GoldenHour> {
        self.golden_hours.values_mut()
    }

    pub fn participant_event(&self, id: i64) -> AppResult<&ParticipantEvent> {
        self.participant_events
            .get(&id)
            .ok_or_else(|| not_found("ParticipantEvent", id))
    }

    pub fn participant_events(&self) -> impl Iterator<Item = &ParticipantEvent> {
        self.participant_events.values()
    }

    pub fn participant_events_mut(&mut self) -> impl Iterator<Item = &mut ParticipantEvent> {
        self.participant_events.values_mut()
    }

    pub fn find_participant_event(
        &self,
        participant_id: i64,
        location_id: i64,
    ) -> Option<&ParticipantEvent> {
        self.participant_events
            .values()
            .find(|pe| pe.participant_id == participant_id && pe.location_id == location_id)
    }

    /// 活动下的地点，按 id 升序
    pub fn locations_of_window(&self, window_id: i64) -> impl Iterator<Item = &Location> {
        self.window_locations
            .get(&window_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.locations.get(id))
    }

    /// 地点下的奖品 id，升序（抽签的稳定顺序）
    pub fn reward_ids_at_location(&self, location_id: i64) -> Vec<i64> {
        self.rewards
            .values()
            .filter(|r| r.location_id == location_id)
            .map(|r| r.id)
            .collect()
    }

    pub fn golden_hours_at_location(&self, location_id: i64) -> impl Iterator<Item = &GoldenHour> {
        self.golden_hours
            .values()
            .filter(move |gh| gh.location_id == location_id)
    }

    /// 区域覆盖的省份；无区域或区域不存在时为空
    pub fn provinces_of(&self, location: &Location) -> Option<&BTreeSet<i64>> {
        location
            .region_id
            .and_then(|id| self.regions.get(&id))
            .map(|region| &region.province_ids)
    }

    /// 地点有效配置: 地点覆盖 → 活动默认值；中奖率在两者之间还会回退到区域默认值
    pub fn effective_settings(&self, location: &Location) -> SpinSettings {
        let region_probability = location
            .region_id
            .and_then(|id| self.regions.get(&id))
            .and_then(|region| region.default_win_probability);
        let window_settings = self
            .windows
            .get(&location.window_id)
            .map(|w| w.settings)
            .unwrap_or(SpinSettings::UNSET);

        let mut effective = location.overrides.or(window_settings);
        effective.default_win_probability = location
            .overrides
            .default_win_probability
            .or(region_probability)
            .or(window_settings.default_win_probability);
        effective
    }
}
