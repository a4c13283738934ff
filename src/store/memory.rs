use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{
    CommitOutcome, InventorySnapshot, ParticipantCounters, ParticipantLedgerStore,
    RewardInventory,
};
use crate::error::{AppError, AppResult};
use crate::models::{CampaignCatalog, SpinHistory};

/// 进程内库存表，锁只在单次读取或单次条件写入期间持有
#[derive(Debug, Default)]
pub struct InMemoryRewardInventory {
    rows: Mutex<HashMap<i64, InventorySnapshot>>,
}

impl InMemoryRewardInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以目录中所有奖品的当前计数建表
    pub fn from_catalog(catalog: &CampaignCatalog) -> Self {
        let rows = catalog
            .rewards()
            .map(|reward| (reward.id, reward.inventory()))
            .collect();
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl RewardInventory for InMemoryRewardInventory {
    async fn load(&self, reward_id: i64) -> AppResult<Option<InventorySnapshot>> {
        Ok(self.rows.lock().await.get(&reward_id).copied())
    }

    async fn upsert(&self, snapshot: InventorySnapshot) -> AppResult<()> {
        self.rows.lock().await.insert(snapshot.reward_id, snapshot);
        Ok(())
    }

    async fn compare_and_commit(
        &self,
        reward_id: i64,
        expected_version: i64,
    ) -> AppResult<CommitOutcome> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&reward_id)
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id}")))?;

        if row.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }
        if !row.can_dispense() {
            return Ok(CommitOutcome::Depleted);
        }
        *row = row.dispensed();
        Ok(CommitOutcome::Committed(*row))
    }

    async fn reset_daily(&self, reward_id: i64) -> AppResult<InventorySnapshot> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&reward_id)
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id}")))?;
        row.daily_count = 0;
        row.version += 1;
        Ok(*row)
    }

    async fn reset_quantity(&self, reward_id: i64) -> AppResult<InventorySnapshot> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&reward_id)
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id}")))?;
        row.remaining_quantity = row.total_quantity;
        row.version += 1;
        Ok(*row)
    }

    async fn reset_all_daily(&self) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        for row in rows.values_mut() {
            row.daily_count = 0;
            row.version += 1;
        }
        Ok(rows.len() as u64)
    }
}

#[derive(Debug, Default)]
struct LedgerRows {
    counters: HashMap<i64, ParticipantCounters>,
    history: Vec<SpinHistory>,
}

impl LedgerRows {
    fn save_if_version(
        &mut self,
        counters: ParticipantCounters,
        expected_version: i64,
    ) -> AppResult<bool> {
        let row = self
            .counters
            .get_mut(&counters.id)
            .ok_or_else(|| AppError::NotFound(format!("ParticipantEvent {}", counters.id)))?;
        if row.version != expected_version {
            return Ok(false);
        }
        *row = counters;
        Ok(true)
    }
}

/// 进程内参与者账本，计数与抽奖记录共用一把锁
#[derive(Debug, Default)]
pub struct InMemoryParticipantLedger {
    rows: Mutex<LedgerRows>,
}

impl InMemoryParticipantLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &CampaignCatalog) -> Self {
        let counters = catalog
            .participant_events()
            .map(|pe| (pe.id, pe.counters()))
            .collect();
        let history = catalog
            .participant_events()
            .flat_map(|pe| pe.history.iter().cloned())
            .collect();
        Self {
            rows: Mutex::new(LedgerRows { counters, history }),
        }
    }
}

#[async_trait]
impl ParticipantLedgerStore for InMemoryParticipantLedger {
    async fn load(&self, id: i64) -> AppResult<Option<ParticipantCounters>> {
        Ok(self.rows.lock().await.counters.get(&id).copied())
    }

    async fn insert(&self, counters: ParticipantCounters) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let duplicate = rows.counters.values().any(|row| {
            row.id == counters.id
                || (row.participant_id == counters.participant_id
                    && row.location_id == counters.location_id)
        });
        if duplicate {
            return Err(AppError::ValidationError(format!(
                "Participant {} already joined location {}",
                counters.participant_id, counters.location_id
            )));
        }
        rows.counters.insert(counters.id, counters);
        Ok(())
    }

    async fn save_if_version(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
    ) -> AppResult<bool> {
        self.rows
            .lock()
            .await
            .save_if_version(counters, expected_version)
    }

    async fn commit_spin(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
        history: &SpinHistory,
    ) -> AppResult<bool> {
        let mut rows = self.rows.lock().await;
        if rows.history.iter().any(|h| h.id == history.id) {
            return Err(AppError::ValidationError(format!(
                "Spin {} already recorded",
                history.id
            )));
        }
        if !rows.save_if_version(counters, expected_version)? {
            return Ok(false);
        }
        rows.history.push(history.clone());
        Ok(true)
    }

    async fn load_history(&self, participant_event_id: i64) -> AppResult<Vec<SpinHistory>> {
        let rows = self.rows.lock().await;
        let mut history: Vec<SpinHistory> = rows
            .history
            .iter()
            .filter(|h| h.participant_event_id == participant_event_id)
            .cloned()
            .collect();
        history.sort_by_key(|h| h.spun_at);
        Ok(history)
    }

    async fn reset_all_daily(&self) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        for row in rows.counters.values_mut() {
            row.daily_spins_used = 0;
            row.version += 1;
        }
        Ok(rows.counters.len() as u64)
    }
}
