//! 抽奖引擎写入的计数的存储接口
//!
//! 两个 trait 都是乐观并发: 每次写入都以调用方上次读到的版本号为条件，
//! 抢写失败以返回值而不是错误表示，调用方重新读取后再试。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{SpinHistory, StatusCode};

pub mod memory;
pub mod sea_orm_store;

pub use memory::{InMemoryParticipantLedger, InMemoryRewardInventory};
pub use sea_orm_store::{SeaOrmParticipantLedger, SeaOrmRewardInventory};

/// 奖品库存计数快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub reward_id: i64,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
    pub daily_limit: Option<i64>,
    pub daily_count: i64,
    pub version: i64,
}

impl InventorySnapshot {
    /// 还能再发放一件
    pub fn can_dispense(&self) -> bool {
        self.remaining_quantity > 0 && self.daily_limit.is_none_or(|limit| self.daily_count < limit)
    }

    /// remaining−1, daily_count+1, version+1
    pub fn dispensed(&self) -> Self {
        Self {
            remaining_quantity: self.remaining_quantity - 1,
            daily_count: self.daily_count + 1,
            version: self.version + 1,
            ..*self
        }
    }
}

/// 一次条件库存写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// 扣减成功，携带写入后的计数
    Committed(InventorySnapshot),
    /// 版本号不一致，需要重新读取后重试
    Conflict,
    /// 库存为 0 或当日已达上限，未做任何修改
    Depleted,
}

/// 参与者账本计数（不含抽奖明细）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCounters {
    pub id: i64,
    pub participant_id: i64,
    pub location_id: i64,
    pub status: StatusCode,
    pub initial_spins: i64,
    pub remaining_spins: i64,
    pub total_spins: i64,
    pub daily_spins_used: i64,
    pub win_count: i64,
    pub total_points: i64,
    pub version: i64,
}

#[async_trait]
pub trait RewardInventory: Send + Sync {
    async fn load(&self, reward_id: i64) -> AppResult<Option<InventorySnapshot>>;

    /// 写入或覆盖整行（用于初始化/同步奖品配置）
    async fn upsert(&self, snapshot: InventorySnapshot) -> AppResult<()>;

    /// 存储中版本号仍为 `expected_version` 且可发放时扣减一件
    /// 扣减与读取写入后计数在同一事务内完成，计数不会越界
    async fn compare_and_commit(
        &self,
        reward_id: i64,
        expected_version: i64,
    ) -> AppResult<CommitOutcome>;

    /// daily_count 归零，version+1
    async fn reset_daily(&self, reward_id: i64) -> AppResult<InventorySnapshot>;

    /// remaining 恢复为 total，version+1
    async fn reset_quantity(&self, reward_id: i64) -> AppResult<InventorySnapshot>;

    /// 所有奖品 daily_count 归零，返回受影响行数
    async fn reset_all_daily(&self) -> AppResult<u64>;
}

#[async_trait]
pub trait ParticipantLedgerStore: Send + Sync {
    async fn load(&self, id: i64) -> AppResult<Option<ParticipantCounters>>;

    /// 新建账本；同一 (participant, location) 已存在时返回 ValidationError
    async fn insert(&self, counters: ParticipantCounters) -> AppResult<()>;

    /// 存储中版本号等于 `expected_version` 时覆盖计数
    /// 版本不一致返回 false，记录不存在返回 `NotFound`
    async fn save_if_version(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
    ) -> AppResult<bool>;

    /// 同一事务内: 按版本号条件写入计数并追加抽奖记录
    /// 版本不一致时两者都不写入，返回 false
    async fn commit_spin(
        &self,
        counters: ParticipantCounters,
        expected_version: i64,
        history: &SpinHistory,
    ) -> AppResult<bool>;

    /// 某账本的全部抽奖记录，按抽奖时间升序
    async fn load_history(&self, participant_event_id: i64) -> AppResult<Vec<SpinHistory>>;

    /// 所有账本 daily_spins_used 归零
    async fn reset_all_daily(&self) -> AppResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_dispense() {
        let snapshot = InventorySnapshot {
            reward_id: 1,
            total_quantity: 2,
            remaining_quantity: 1,
            daily_limit: Some(1),
            daily_count: 0,
            version: 0,
        };
        assert!(snapshot.can_dispense());
        let after = snapshot.dispensed();
        assert_eq!(after.remaining_quantity, 0);
        assert_eq!(after.daily_count, 1);
        assert_eq!(after.version, 1);
        assert!(!after.can_dispense());

        let unlimited = InventorySnapshot {
            daily_limit: None,
            daily_count: 500,
            ..snapshot
        };
        assert!(unlimited.can_dispense());
    }
}
