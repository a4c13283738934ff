use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

use super::eligibility::find_usable_golden_hour;
use super::quantity_ledger::QuantityLedger;
use super::reward_selector::RewardSelector;
use super::spin_budget::SpinBudgetTracker;
use crate::config::SpinPolicy;
use crate::error::{AppError, AppResult};
use crate::models::{
    CampaignCatalog, GoldenHour, ParticipantEvent, SpinDecision, SpinOutcome, SpinReceipt,
};
use crate::store::{CommitOutcome, ParticipantLedgerStore, RewardInventory};

/// 抽奖编排：资格检查 → 抽签 → 扣库存（冲突重试）→ 记账 → 结算
pub struct SpinService<R: RewardInventory, P: ParticipantLedgerStore> {
    selector: RewardSelector,
    budget: SpinBudgetTracker,
    ledger: QuantityLedger<R>,
    participants: Arc<P>,
    max_commit_retries: u32,
}

impl<R: RewardInventory, P: ParticipantLedgerStore> SpinService<R, P> {
    pub fn new(policy: SpinPolicy, inventory: Arc<R>, participants: Arc<P>) -> Self {
        Self {
            selector: RewardSelector::new(policy.weighting_mode),
            max_commit_retries: policy.max_commit_retries,
            budget: SpinBudgetTracker::new(policy),
            ledger: QuantityLedger::new(inventory),
            participants,
        }
    }

    pub fn budget(&self) -> &SpinBudgetTracker {
        &self.budget
    }

    pub fn ledger(&self) -> &QuantityLedger<R> {
        &self.ledger
    }

    /// 执行一次抽奖
    ///
    /// 先用存储层计数刷新账本，不能抽奖时返回 `SpinDecision::NotAllowed`，不修改任何计数。
    /// 库存提交冲突最多重试 `max_commit_retries` 次，仍失败则按未中奖处理。
    /// 账本计数与结算后的抽奖记录在同一事务内写入。
    pub async fn spin<G: Rng + ?Sized>(
        &self,
        catalog: &mut CampaignCatalog,
        participant_event_id: i64,
        now: DateTime<Utc>,
        rng: &mut G,
    ) -> AppResult<SpinDecision> {
        let mut pe = self
            .load_participant_event(catalog, participant_event_id)
            .await?;

        if let Err(denial) = self.budget.check_can_spin(catalog, &pe, now) {
            log::info!("Spin denied for participant event {}: {denial}", pe.id);
            return Ok(SpinDecision::NotAllowed(denial));
        }

        let golden_hour = find_usable_golden_hour(catalog, pe.location_id, now).cloned();
        let reward_ids = catalog.reward_ids_at_location(pe.location_id);

        let (outcome, attempts) = self
            .draw_and_commit(catalog, &reward_ids, golden_hour.as_ref(), now, rng)
            .await?;

        // 记账、结算，再以旧版本号持久化
        let expected_version = pe.version;
        let history =
            self.budget
                .record_spin(catalog, &mut pe, &outcome, golden_hour.as_ref(), now)?;
        self.budget.finalize_spin(&mut pe, history.id)?;
        let history = pe
            .spin(history.id)
            .cloned()
            .ok_or_else(|| AppError::InternalError("Spin history vanished".into()))?;

        let saved = self
            .participants
            .commit_spin(pe.counters(), expected_version, &history)
            .await?;
        if !saved {
            return Err(AppError::StateError(format!(
                "Participant event {} was modified concurrently",
                pe.id
            )));
        }

        if let Some(gh) = &golden_hour {
            catalog.golden_hour_mut(gh.id)?.increment_uses();
        }
        let remaining_spins = pe.remaining_spins;
        catalog.put_participant_event(pe);

        if outcome.is_win() {
            log::info!(
                "Participant event {participant_event_id} won reward {:?} after {attempts} attempt(s)",
                outcome.reward_id()
            );
        }
        Ok(SpinDecision::Completed(SpinReceipt {
            outcome,
            history,
            remaining_spins,
            attempts,
        }))
    }

    /// 以存储层为准读取账本并写回目录
    ///
    /// 目录中已有该账本时只覆盖计数；没有时连同抽奖记录一起从存储重建。
    pub async fn load_participant_event(
        &self,
        catalog: &mut CampaignCatalog,
        participant_event_id: i64,
    ) -> AppResult<ParticipantEvent> {
        let counters = self
            .participants
            .load(participant_event_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("ParticipantEvent {participant_event_id}"))
            })?;

        let pe = match catalog.participant_event(participant_event_id) {
            Ok(cached) => {
                let mut pe = cached.clone();
                pe.apply_counters(&counters);
                pe
            }
            Err(_) => {
                let history = self.participants.load_history(participant_event_id).await?;
                ParticipantEvent::from_counters(&counters, history)
            }
        };
        catalog.put_participant_event(pe.clone());
        Ok(pe)
    }

    /// 选奖 + 扣库存，返回结果与尝试轮数
    async fn draw_and_commit<G: Rng + ?Sized>(
        &self,
        catalog: &mut CampaignCatalog,
        reward_ids: &[i64],
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
        rng: &mut G,
    ) -> AppResult<(SpinOutcome, u32)> {
        let max_attempts = self.max_commit_retries.saturating_add(1);

        for attempt in 1..=max_attempts {
            // 每轮先用存储中的最新计数刷新候选奖品，没有库存记录的奖品不参与抽签
            let mut drawable = Vec::with_capacity(reward_ids.len());
            for &id in reward_ids {
                let reward = catalog.reward_mut(id)?;
                if self.ledger.refresh(reward).await? {
                    drawable.push(id);
                } else {
                    log::warn!("Reward {id} has no inventory record, skipped");
                }
            }

            let outcome = self
                .selector
                .select_outcome(catalog, &drawable, golden_hour, now, rng);
            let SpinOutcome::Win { reward_id, .. } = outcome else {
                return Ok((SpinOutcome::Loss, attempt));
            };

            let reward = catalog.reward_mut(reward_id)?;
            // 扣库存之前校验，避免扣减后才记账失败
            reward.validate_points()?;
            match self.ledger.commit_win(reward).await? {
                CommitOutcome::Committed(_) => return Ok((outcome, attempt)),
                CommitOutcome::Conflict | CommitOutcome::Depleted => {
                    log::warn!(
                        "Commit of reward {reward_id} failed (attempt {attempt}/{max_attempts}), retrying"
                    );
                }
            }
        }

        log::warn!("Inventory commit retries exhausted, spin degraded to LOSS");
        Ok((SpinOutcome::Loss, max_attempts))
    }

    /// 参与者加入地点并持久化账本
    pub async fn join(
        &self,
        catalog: &mut CampaignCatalog,
        participant_id: i64,
        location_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ParticipantEvent> {
        let pe = self
            .budget
            .join(catalog, participant_id, location_id, now)?;
        if let Err(err) = self.participants.insert(pe.counters()).await {
            catalog.remove_participant_event(pe.id);
            return Err(err);
        }
        Ok(pe)
    }

    /// 追加抽奖次数并按版本号持久化
    pub async fn grant_spins(
        &self,
        catalog: &mut CampaignCatalog,
        participant_event_id: i64,
        count: i64,
    ) -> AppResult<ParticipantEvent> {
        let mut pe = self
            .load_participant_event(catalog, participant_event_id)
            .await?;
        let expected_version = pe.version;
        self.budget.grant_spins(&mut pe, count)?;
        if !self
            .participants
            .save_if_version(pe.counters(), expected_version)
            .await?
        {
            return Err(AppError::StateError(format!(
                "Participant event {} was modified concurrently",
                pe.id
            )));
        }
        catalog.put_participant_event(pe.clone());
        log::info!("Granted {count} spins to participant event {participant_event_id}");
        Ok(pe)
    }

    /// 每日重置入口：奖品当日发放数、黄金时段使用次数、参与者当日已用次数
    pub async fn reset_day(&self, catalog: &mut CampaignCatalog) -> AppResult<()> {
        let rewards = self.ledger.reset_all_daily().await?;
        for reward in catalog.rewards_mut() {
            if !self.ledger.refresh(reward).await? {
                reward.daily_count = 0;
            }
        }

        for gh in catalog.golden_hours_mut() {
            gh.reset_uses();
        }

        let ledgers = self.participants.reset_all_daily().await?;
        for pe in catalog.participant_events_mut() {
            match self.participants.load(pe.id).await? {
                Some(counters) => pe.apply_counters(&counters),
                None => self.budget.reset_daily(pe),
            }
        }

        log::info!("Daily reset done: {rewards} rewards, {ledgers} participant events");
        Ok(())
    }
}
