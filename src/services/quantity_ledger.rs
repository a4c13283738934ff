use std::sync::Arc;

use crate::error::AppResult;
use crate::models::Reward;
use crate::store::{CommitOutcome, RewardInventory};

/// 奖品库存账本：条件扣减 remaining / daily_count，版本号不一致时返回 Conflict
pub struct QuantityLedger<S: RewardInventory> {
    store: Arc<S>,
}

impl<S: RewardInventory> Clone for QuantityLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RewardInventory> QuantityLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 以读取时的版本号扣减一件库存
    /// 成功时用存储层计数覆盖本地副本；`Conflict` / `Depleted` 时本地副本不变，
    /// 调用方应先 [`refresh`](Self::refresh) 再重试
    pub async fn commit_win(&self, reward: &mut Reward) -> AppResult<CommitOutcome> {
        if reward.remaining_quantity <= 0 {
            return Ok(CommitOutcome::Depleted);
        }

        let outcome = self
            .store
            .compare_and_commit(reward.id, reward.version)
            .await?;
        match outcome {
            CommitOutcome::Committed(snapshot) => {
                reward.apply_inventory(&snapshot);
                log::info!(
                    "Reward {} dispensed, remaining {}",
                    reward.id,
                    snapshot.remaining_quantity
                );
            }
            CommitOutcome::Conflict => {
                log::warn!(
                    "Inventory version conflict on reward {} (expected version {})",
                    reward.id,
                    reward.version
                );
            }
            CommitOutcome::Depleted => {
                log::debug!("Reward {} depleted at commit time", reward.id);
            }
        }
        Ok(outcome)
    }

    /// 从存储重新读取计数；存储中没有该奖品时返回 false，本地副本不变
    pub async fn refresh(&self, reward: &mut Reward) -> AppResult<bool> {
        match self.store.load(reward.id).await? {
            Some(snapshot) => {
                reward.apply_inventory(&snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn reset_daily(&self, reward: &mut Reward) -> AppResult<()> {
        let snapshot = self.store.reset_daily(reward.id).await?;
        reward.apply_inventory(&snapshot);
        Ok(())
    }

    /// 剩余库存恢复为总量
    pub async fn reset_quantity(&self, reward: &mut Reward) -> AppResult<()> {
        let snapshot = self.store.reset_quantity(reward.id).await?;
        reward.apply_inventory(&snapshot);
        Ok(())
    }

    pub async fn reset_all_daily(&self) -> AppResult<u64> {
        self.store.reset_all_daily().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use crate::store::InMemoryRewardInventory;

    #[tokio::test]
    async fn test_commit_win_updates_local_copy() {
        let mut reward = reward(1, LOCATION_ID, 0.5, 2);
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        ledger.store().upsert(reward.inventory()).await.unwrap();

        let outcome = ledger.commit_win(&mut reward).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        assert_eq!(reward.remaining_quantity, 1);
        assert_eq!(reward.daily_count, 1);
        assert_eq!(reward.version, 1);
    }

    #[tokio::test]
    async fn test_depleted_without_store_call() {
        let mut reward = reward(1, LOCATION_ID, 0.5, 0);
        // 存储里没有这一行: 若调用存储会得到 NotFound
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        assert_eq!(
            ledger.commit_win(&mut reward).await.unwrap(),
            CommitOutcome::Depleted
        );
        assert_eq!(reward.remaining_quantity, 0);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_then_refresh() {
        let mut reward = reward(1, LOCATION_ID, 0.5, 3);
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        ledger.store().upsert(reward.inventory()).await.unwrap();

        let mut stale = reward.clone();
        ledger.commit_win(&mut reward).await.unwrap();
        assert_eq!(
            ledger.commit_win(&mut stale).await.unwrap(),
            CommitOutcome::Conflict
        );
        assert_eq!(stale.remaining_quantity, 3);

        assert!(ledger.refresh(&mut stale).await.unwrap());
        assert_eq!(stale.remaining_quantity, 2);
        assert!(matches!(
            ledger.commit_win(&mut stale).await.unwrap(),
            CommitOutcome::Committed(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_row_keeps_local_copy() {
        let mut reward = reward(1, LOCATION_ID, 0.5, 3);
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        assert!(!ledger.refresh(&mut reward).await.unwrap());
        assert_eq!(reward.remaining_quantity, 3);
        assert_eq!(reward.version, 0);
    }

    #[tokio::test]
    async fn test_daily_limit_reached_is_depleted() {
        let mut reward = reward(1, LOCATION_ID, 0.5, 5).with_daily_limit(1);
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        ledger.store().upsert(reward.inventory()).await.unwrap();

        ledger.commit_win(&mut reward).await.unwrap();
        assert_eq!(
            ledger.commit_win(&mut reward).await.unwrap(),
            CommitOutcome::Depleted
        );

        ledger.reset_daily(&mut reward).await.unwrap();
        assert_eq!(reward.daily_count, 0);
        assert!(matches!(
            ledger.commit_win(&mut reward).await.unwrap(),
            CommitOutcome::Committed(_)
        ));

        ledger.reset_quantity(&mut reward).await.unwrap();
        assert_eq!(reward.remaining_quantity, 5);
        assert_eq!(reward.total_quantity, 5);
        assert_eq!(ledger.reset_all_daily().await.unwrap(), 1);
    }

    #[test]
    fn test_ledger_clone_shares_store() {
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        let other = ledger.clone();
        assert!(std::ptr::eq(ledger.store(), other.store()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_never_oversell() {
        const STOCK: i64 = 5;
        const CONTENDERS: usize = 32;

        let reward = reward(1, LOCATION_ID, 1.0, STOCK);
        let ledger = QuantityLedger::new(Arc::new(InMemoryRewardInventory::new()));
        ledger.store().upsert(reward.inventory()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..CONTENDERS {
            let ledger = ledger.clone();
            let mut local = reward.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match ledger.commit_win(&mut local).await.unwrap() {
                        CommitOutcome::Committed(_) => return true,
                        CommitOutcome::Depleted => return false,
                        CommitOutcome::Conflict => {
                            ledger.refresh(&mut local).await.unwrap();
                        }
                    }
                }
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                committed += 1;
            }
        }
        assert_eq!(committed, STOCK);

        let stored = ledger.store().load(1).await.unwrap().unwrap();
        assert_eq!(stored.remaining_quantity, 0);
        assert_eq!(stored.daily_count, STOCK);
    }
}
