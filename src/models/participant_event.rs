use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use crate::error::{AppError, AppResult};
use crate::store::ParticipantCounters;

/// 参与者在某个活动地点的抽奖账本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantEvent {
    pub id: i64,
    pub participant_id: i64,
    pub location_id: i64,
    pub status: Status,
    pub initial_spins: i64,
    pub remaining_spins: i64,
    /// 累计已抽次数
    pub total_spins: i64,
    pub daily_spins_used: i64,
    pub win_count: i64,
    pub total_points: i64,
    /// 账本乐观锁版本号，每次计数变更 +1
    pub version: i64,
    pub history: Vec<SpinHistory>,
}

impl ParticipantEvent {
    pub fn new(id: i64, participant_id: i64, location_id: i64, initial_spins: i64) -> AppResult<Self> {
        if initial_spins < 0 {
            return Err(AppError::ValidationError(
                "Initial spins cannot be negative".into(),
            ));
        }
        Ok(Self {
            id,
            participant_id,
            location_id,
            status: Status::active(),
            initial_spins,
            remaining_spins: initial_spins,
            total_spins: 0,
            daily_spins_used: 0,
            win_count: 0,
            total_points: 0,
            version: 0,
            history: Vec::new(),
        })
    }

    /// 由存储层计数与抽奖记录重建账本
    pub fn from_counters(counters: &ParticipantCounters, history: Vec<SpinHistory>) -> Self {
        Self {
            id: counters.id,
            participant_id: counters.participant_id,
            location_id: counters.location_id,
            status: Status {
                code: counters.status,
                activated_at: None,
                deactivated_at: None,
            },
            initial_spins: counters.initial_spins,
            remaining_spins: counters.remaining_spins,
            total_spins: counters.total_spins,
            daily_spins_used: counters.daily_spins_used,
            win_count: counters.win_count,
            total_points: counters.total_points,
            version: counters.version,
            history,
        }
    }

    pub fn has_pending_spins(&self) -> bool {
        self.history.iter().any(SpinHistory::is_pending)
    }

    pub fn spin(&self, spin_id: Uuid) -> Option<&SpinHistory> {
        self.history.iter().find(|h| h.id == spin_id)
    }

    pub fn spin_mut(&mut self, spin_id: Uuid) -> Option<&mut SpinHistory> {
        self.history.iter_mut().find(|h| h.id == spin_id)
    }

    /// 用存储层最新计数覆盖本地副本（抽奖记录不变）
    pub fn apply_counters(&mut self, counters: &ParticipantCounters) {
        self.status.code = counters.status;
        self.initial_spins = counters.initial_spins;
        self.remaining_spins = counters.remaining_spins;
        self.total_spins = counters.total_spins;
        self.daily_spins_used = counters.daily_spins_used;
        self.win_count = counters.win_count;
        self.total_points = counters.total_points;
        self.version = counters.version;
    }

    pub fn counters(&self) -> ParticipantCounters {
        ParticipantCounters {
            id: self.id,
            participant_id: self.participant_id,
            location_id: self.location_id,
            status: self.status.code,
            initial_spins: self.initial_spins,
            remaining_spins: self.remaining_spins,
            total_spins: self.total_spins,
            daily_spins_used: self.daily_spins_used,
            win_count: self.win_count,
            total_points: self.total_points,
            version: self.version,
        }
    }
}

/// 单次抽奖记录，结算 (finalize) 后不可再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinHistory {
    pub id: Uuid,
    pub participant_event_id: i64,
    pub location_id: i64,
    pub reward_id: Option<i64>,
    pub golden_hour_id: Option<i64>,
    pub win: bool,
    pub points_earned: i64,
    pub points_spent: i64,
    pub spun_at: DateTime<Utc>,
    pub finalized: bool,
    pub status: Status,
}

impl SpinHistory {
    pub fn loss(
        participant_event_id: i64,
        location_id: i64,
        golden_hour_id: Option<i64>,
        spun_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant_event_id,
            location_id,
            reward_id: None,
            golden_hour_id,
            win: false,
            points_earned: 0,
            points_spent: 0,
            spun_at,
            finalized: false,
            status: Status::active(),
        }
    }

    pub fn win(
        participant_event_id: i64,
        location_id: i64,
        reward_id: i64,
        golden_hour_id: Option<i64>,
        points_earned: i64,
        points_spent: i64,
        spun_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if points_earned < 0 || points_spent < 0 {
            return Err(AppError::ValidationError(
                "Points cannot be negative".into(),
            ));
        }
        Ok(Self {
            reward_id: Some(reward_id),
            win: true,
            points_earned,
            points_spent,
            ..Self::loss(participant_event_id, location_id, golden_hour_id, spun_at)
        })
    }

    /// 未结算且未取消
    pub fn is_pending(&self) -> bool {
        !self.finalized && self.status.is_active()
    }

    pub fn finalize(&mut self) -> AppResult<()> {
        if self.finalized {
            return Err(AppError::StateError(format!(
                "Spin {} is already finalized",
                self.id
            )));
        }
        if !self.status.is_active() {
            return Err(AppError::StateError(format!(
                "Spin {} was cancelled",
                self.id
            )));
        }
        self.finalized = true;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.finalized {
            return Err(AppError::StateError(format!(
                "Cannot cancel finalized spin {}",
                self.id
            )));
        }
        super::status::deactivate(&mut self.status, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_event() {
        let pe = ParticipantEvent::new(1, 100, 10, 3).unwrap();
        assert_eq!(pe.remaining_spins, 3);
        assert_eq!(pe.initial_spins, 3);
        assert!(!pe.has_pending_spins());
        assert!(ParticipantEvent::new(1, 100, 10, -1).is_err());
    }

    #[test]
    fn test_apply_counters_keeps_history() {
        let mut pe = ParticipantEvent::new(1, 100, 10, 3).unwrap();
        pe.history.push(SpinHistory::loss(1, 10, None, Utc::now()));
        let mut stored = pe.counters();
        stored.remaining_spins = 1;
        stored.daily_spins_used = 0;
        stored.version = 4;
        pe.apply_counters(&stored);
        assert_eq!(pe.counters(), stored);
        assert_eq!(pe.history.len(), 1);
    }

    #[test]
    fn test_rebuild_from_counters() {
        let mut pe = ParticipantEvent::new(3, 100, 10, 5).unwrap();
        let spin = SpinHistory::loss(3, 10, None, Utc::now());
        pe.history.push(spin.clone());
        let rebuilt = ParticipantEvent::from_counters(&pe.counters(), vec![spin]);
        assert_eq!(rebuilt, pe);
    }

    #[test]
    fn test_finalize_once() {
        let mut spin = SpinHistory::loss(1, 10, None, Utc::now());
        assert!(spin.is_pending());
        spin.finalize().unwrap();
        assert!(!spin.is_pending());
        assert!(matches!(spin.finalize(), Err(AppError::StateError(_))));
        assert!(matches!(spin.cancel(Utc::now()), Err(AppError::StateError(_))));
    }

    #[test]
    fn test_cancelled_spin_is_not_pending() {
        let mut spin = SpinHistory::win(1, 10, 7, Some(3), 20, 5, Utc::now()).unwrap();
        assert!(spin.win);
        assert_eq!(spin.reward_id, Some(7));
        spin.cancel(Utc::now()).unwrap();
        assert!(!spin.is_pending());
        assert!(spin.finalize().is_err());
    }

    #[test]
    fn test_negative_points_rejected() {
        assert!(SpinHistory::win(1, 10, 7, None, -1, 0, Utc::now()).is_err());
    }
}
