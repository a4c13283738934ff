use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::eligibility::Eligible;
use crate::config::SpinPolicy;
use crate::error::{AppError, AppResult};
use crate::models::status;
use crate::models::{
    CampaignCatalog, Eligibility, GoldenHour, ParticipantEvent, SpinDenial, SpinHistory,
    SpinOutcome,
};

/// 参与者抽奖次数账本
///
/// 计数只在这里修改；每次修改 version +1，持久化时以旧 version 作为条件。
#[derive(Debug, Clone, Default)]
pub struct SpinBudgetTracker {
    policy: SpinPolicy,
}

impl SpinBudgetTracker {
    pub fn new(policy: SpinPolicy) -> Self {
        Self { policy }
    }

    /// 当日可抽上限
    pub fn daily_cap_for(&self, catalog: &CampaignCatalog, pe: &ParticipantEvent) -> i64 {
        if self.policy.use_location_daily_limit
            && let Ok(location) = catalog.location(pe.location_id)
            && let Some(limit) = catalog.effective_settings(location).daily_spin_limit
        {
            return limit;
        }
        self.policy.daily_spin_cap
    }

    pub fn check_can_spin(
        &self,
        catalog: &CampaignCatalog,
        pe: &ParticipantEvent,
        now: DateTime<Utc>,
    ) -> Result<(), SpinDenial> {
        if let Eligibility::Inactive(reason) = pe.check(catalog, now) {
            return Err(SpinDenial::Ineligible { reason });
        }
        if pe.remaining_spins <= 0 {
            return Err(SpinDenial::NoRemainingSpins);
        }
        let cap = self.daily_cap_for(catalog, pe);
        if pe.daily_spins_used >= cap {
            return Err(SpinDenial::DailyCapReached { cap });
        }
        Ok(())
    }

    pub fn can_spin(
        &self,
        catalog: &CampaignCatalog,
        pe: &ParticipantEvent,
        now: DateTime<Utc>,
    ) -> bool {
        self.check_can_spin(catalog, pe, now).is_ok()
    }

    /// 记一次抽奖: 修改计数并追加抽奖记录
    ///
    /// 当前不能抽奖时返回 `StateError`。
    /// 中奖时累加奖品积分，有黄金时段时按其积分倍率加成。
    pub fn record_spin(
        &self,
        catalog: &CampaignCatalog,
        pe: &mut ParticipantEvent,
        outcome: &SpinOutcome,
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
    ) -> AppResult<SpinHistory> {
        if let Err(denial) = self.check_can_spin(catalog, pe, now) {
            return Err(AppError::StateError(format!(
                "Participant event {} cannot spin: {denial}",
                pe.id
            )));
        }

        let golden_hour_id = golden_hour.map(|gh| gh.id);
        let history = match outcome {
            SpinOutcome::Win { reward_id, .. } => {
                let reward = catalog.reward(*reward_id)?;
                let points = match golden_hour {
                    Some(gh) => gh.apply_points(reward.points),
                    None => reward.points,
                };
                pe.win_count = pe.win_count.saturating_add(1);
                pe.total_points = pe.total_points.saturating_add(points);
                SpinHistory::win(
                    pe.id,
                    pe.location_id,
                    reward.id,
                    golden_hour_id,
                    points,
                    reward.points_required.unwrap_or(0),
                    now,
                )?
            }
            SpinOutcome::Loss => SpinHistory::loss(pe.id, pe.location_id, golden_hour_id, now),
        };

        pe.remaining_spins -= 1;
        pe.daily_spins_used += 1;
        pe.total_spins = pe.total_spins.saturating_add(1);
        pe.version += 1;
        pe.history.push(history.clone());
        Ok(history)
    }

    pub fn reset_daily(&self, pe: &mut ParticipantEvent) {
        pe.daily_spins_used = 0;
        pe.version += 1;
    }

    /// 追加抽奖次数
    pub fn grant_spins(&self, pe: &mut ParticipantEvent, count: i64) -> AppResult<()> {
        if count <= 0 {
            return Err(AppError::ValidationError(
                "Granted spins must be positive".into(),
            ));
        }
        pe.remaining_spins = pe.remaining_spins.saturating_add(count);
        pe.version += 1;
        Ok(())
    }

    /// 参与者加入地点，初始次数取地点有效配置（未配置为 0）
    /// 新账本写入目录，并返回一份副本供持久化
    pub fn join(
        &self,
        catalog: &mut CampaignCatalog,
        participant_id: i64,
        location_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ParticipantEvent> {
        let participant = catalog.participant(participant_id)?;
        if !participant.is_active(catalog, now) {
            return Err(AppError::StateError(format!(
                "Participant {participant_id} is not active"
            )));
        }
        let location = catalog.location(location_id)?;
        if let Eligibility::Inactive(reason) = location.check(catalog, now) {
            return Err(AppError::StateError(format!(
                "Location {location_id} is not open: {reason}"
            )));
        }
        if catalog
            .find_participant_event(participant_id, location_id)
            .is_some()
        {
            return Err(AppError::ValidationError(format!(
                "Participant {participant_id} already joined location {location_id}"
            )));
        }

        let initial_spins = catalog
            .effective_settings(location)
            .initial_spins
            .unwrap_or(0);
        let pe = ParticipantEvent::new(
            catalog.next_participant_event_id(),
            participant_id,
            location_id,
            initial_spins,
        )?;
        catalog.put_participant_event(pe.clone());
        log::info!(
            "Participant {participant_id} joined location {location_id} with {initial_spins} spins"
        );
        Ok(pe)
    }

    /// 启用前要求地点与参与者都处于可用状态
    pub fn activate(
        &self,
        catalog: &CampaignCatalog,
        pe: &mut ParticipantEvent,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let location_open = catalog
            .location(pe.location_id)
            .is_ok_and(|l| l.is_active(catalog, now));
        let participant_active = catalog
            .participant(pe.participant_id)
            .is_ok_and(|p| p.is_active(catalog, now));
        if !location_open || !participant_active {
            return Err(AppError::StateError(format!(
                "Cannot activate participant event {}: location or participant inactive",
                pe.id
            )));
        }
        status::activate(&mut pe.status, now)?;
        pe.version += 1;
        Ok(())
    }

    /// 存在未结算的抽奖记录时不可停用
    pub fn deactivate(&self, pe: &mut ParticipantEvent, now: DateTime<Utc>) -> AppResult<()> {
        if pe.has_pending_spins() {
            return Err(AppError::StateError(format!(
                "Participant event {} has unfinalized spins",
                pe.id
            )));
        }
        status::deactivate(&mut pe.status, now)?;
        pe.version += 1;
        Ok(())
    }

    pub fn finalize_spin(&self, pe: &mut ParticipantEvent, spin_id: Uuid) -> AppResult<()> {
        pe.spin_mut(spin_id)
            .ok_or_else(|| AppError::NotFound(format!("Spin {spin_id}")))?
            .finalize()
    }

    pub fn cancel_spin(
        &self,
        pe: &mut ParticipantEvent,
        spin_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        pe.spin_mut(spin_id)
            .ok_or_else(|| AppError::NotFound(format!("Spin {spin_id}")))?
            .cancel(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use crate::models::{InactiveReason, SpinSettings};

    fn tracker() -> SpinBudgetTracker {
        SpinBudgetTracker::new(SpinPolicy::default())
    }

    fn setup(spins: i64) -> (CampaignCatalog, ParticipantEvent) {
        let mut catalog = campaign();
        catalog
            .insert_reward(reward(1, LOCATION_ID, 0.5, 3).with_points(15))
            .unwrap();
        let id = joined(&mut catalog, spins);
        let pe = catalog.participant_event(id).unwrap().clone();
        (catalog, pe)
    }

    #[test]
    fn test_record_loss_updates_counters() {
        let (catalog, mut pe) = setup(3);
        let history = tracker()
            .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
            .unwrap();
        assert!(!history.win);
        assert_eq!(pe.remaining_spins, 2);
        assert_eq!(pe.daily_spins_used, 1);
        assert_eq!(pe.total_spins, 1);
        assert_eq!(pe.win_count, 0);
        assert_eq!(pe.version, 1);
        assert_eq!(pe.history.len(), 1);
    }

    #[test]
    fn test_record_win_adds_points() {
        let (mut catalog, mut pe) = setup(3);
        catalog.reward_mut(1).unwrap().points_required = Some(4);
        let outcome = SpinOutcome::Win {
            reward_id: 1,
            probability: 0.5,
        };
        let history = tracker()
            .record_spin(&catalog, &mut pe, &outcome, None, now())
            .unwrap();
        assert!(history.win);
        assert_eq!(history.points_earned, 15);
        assert_eq!(history.points_spent, 4);
        assert_eq!(pe.win_count, 1);
        assert_eq!(pe.total_points, 15);
    }

    #[test]
    fn test_golden_hour_boosts_points() {
        let (mut catalog, mut pe) = setup(3);
        let mut gh = golden_hour(5, LOCATION_ID, 2.0);
        gh.points_multiplier = 1.5;
        catalog.insert_golden_hour(gh).unwrap();
        let gh = catalog.golden_hour(5).unwrap();

        let outcome = SpinOutcome::Win {
            reward_id: 1,
            probability: 1.0,
        };
        let history = tracker()
            .record_spin(&catalog, &mut pe, &outcome, Some(gh), now())
            .unwrap();
        assert_eq!(history.points_earned, 22);
        assert_eq!(history.golden_hour_id, Some(5));
    }

    #[test]
    fn test_no_remaining_spins() {
        let (catalog, mut pe) = setup(1);
        let tracker = tracker();
        tracker
            .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
            .unwrap();
        assert_eq!(
            tracker.check_can_spin(&catalog, &pe, now()),
            Err(SpinDenial::NoRemainingSpins)
        );
        let err = tracker
            .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
            .unwrap_err();
        assert!(matches!(err, AppError::StateError(_)));
        assert_eq!(pe.remaining_spins, 0);
        assert_eq!(pe.total_spins, 1);
    }

    #[test]
    fn test_daily_cap_and_reset() {
        let (catalog, mut pe) = setup(20);
        let tracker = SpinBudgetTracker::new(SpinPolicy {
            daily_spin_cap: 2,
            ..SpinPolicy::default()
        });
        for _ in 0..2 {
            tracker
                .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
                .unwrap();
        }
        assert_eq!(
            tracker.check_can_spin(&catalog, &pe, now()),
            Err(SpinDenial::DailyCapReached { cap: 2 })
        );
        tracker.reset_daily(&mut pe);
        assert!(tracker.can_spin(&catalog, &pe, now()));
        assert_eq!(pe.remaining_spins, 18);
    }

    #[test]
    fn test_location_daily_limit_policy() {
        let (catalog, pe) = setup(20);
        let tracker = SpinBudgetTracker::new(SpinPolicy {
            use_location_daily_limit: true,
            ..SpinPolicy::default()
        });
        // 活动标准配置: 每日 5 次
        assert_eq!(tracker.daily_cap_for(&catalog, &pe), 5);
        assert_eq!(self::tracker().daily_cap_for(&catalog, &pe), 10);
    }

    #[test]
    fn test_inactive_participant_event_cannot_spin() {
        let (catalog, mut pe) = setup(3);
        let tracker = tracker();
        tracker.deactivate(&mut pe, now()).unwrap();
        assert_eq!(
            tracker.check_can_spin(&catalog, &pe, now()),
            Err(SpinDenial::Ineligible {
                reason: InactiveReason::StatusNotActive
            })
        );
        tracker.activate(&catalog, &mut pe, now()).unwrap();
        assert!(tracker.can_spin(&catalog, &pe, now()));
    }

    #[test]
    fn test_deactivate_blocked_by_pending_spin() {
        let (catalog, mut pe) = setup(3);
        let tracker = tracker();
        let history = tracker
            .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
            .unwrap();
        assert!(matches!(
            tracker.deactivate(&mut pe, now()),
            Err(AppError::StateError(_))
        ));

        tracker.finalize_spin(&mut pe, history.id).unwrap();
        assert!(tracker.finalize_spin(&mut pe, history.id).is_err());
        tracker.deactivate(&mut pe, now()).unwrap();
    }

    #[test]
    fn test_cancelled_spin_unblocks_deactivation() {
        let (catalog, mut pe) = setup(3);
        let tracker = tracker();
        let history = tracker
            .record_spin(&catalog, &mut pe, &SpinOutcome::Loss, None, now())
            .unwrap();
        tracker.cancel_spin(&mut pe, history.id, now()).unwrap();
        tracker.deactivate(&mut pe, now()).unwrap();
        assert!(matches!(
            tracker.cancel_spin(&mut pe, Uuid::new_v4(), now()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_activate_requires_open_location() {
        let (mut catalog, mut pe) = setup(3);
        let tracker = tracker();
        tracker.deactivate(&mut pe, now()).unwrap();
        status::deactivate(&mut catalog.location_mut(LOCATION_ID).unwrap().status, now())
            .unwrap();
        assert!(matches!(
            tracker.activate(&catalog, &mut pe, now()),
            Err(AppError::StateError(_))
        ));
    }

    #[test]
    fn test_grant_spins() {
        let (_, mut pe) = setup(0);
        let tracker = tracker();
        assert!(tracker.grant_spins(&mut pe, 0).is_err());
        tracker.grant_spins(&mut pe, 3).unwrap();
        assert_eq!(pe.remaining_spins, 3);
    }

    #[test]
    fn test_join_uses_effective_initial_spins() {
        let mut catalog = campaign();
        let tracker = tracker();
        let pe = tracker
            .join(&mut catalog, PARTICIPANT_ID, LOCATION_ID, now())
            .unwrap();
        assert_eq!(pe.initial_spins, 10);
        assert_eq!(pe.remaining_spins, 10);
        assert!(catalog.participant_event(pe.id).is_ok());
        assert!(matches!(
            tracker.join(&mut catalog, PARTICIPANT_ID, LOCATION_ID, now()),
            Err(AppError::ValidationError(_))
        ));

        catalog.window_mut(WINDOW_ID).unwrap().settings = SpinSettings::UNSET;
        catalog.insert_participant(crate::models::Participant::new(101, "p-101", "Bob"));
        let pe = tracker.join(&mut catalog, 101, LOCATION_ID, now()).unwrap();
        assert_eq!(pe.remaining_spins, 0);
    }
}
