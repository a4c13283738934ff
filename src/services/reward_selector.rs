use chrono::{DateTime, Utc};
use rand::Rng;

use super::eligibility::Eligible;
use crate::config::WeightingMode;
use crate::models::{CampaignCatalog, GoldenHour, Reward, SpinOutcome};

/// 单次加权抽签
///
/// 奖品按 id 升序累加权重，取第一个累计权重 > r 的奖品；剩余的 1-Σ 为未中奖。
/// `Raw` 模式下 Σ>1 时不做归一化，排在后面的奖品可能永远抽不到。
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardSelector {
    mode: WeightingMode,
}

impl RewardSelector {
    pub fn new(mode: WeightingMode) -> Self {
        Self { mode }
    }

    /// 单个奖品的有效权重: 自身中奖率 → 地点有效默认值 → 0，
    /// 黄金时段在同一地点且当前可用时再乘以其倍率
    pub fn weigh(
        &self,
        catalog: &CampaignCatalog,
        reward: &Reward,
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
    ) -> f64 {
        let location_default = catalog
            .location(reward.location_id)
            .ok()
            .and_then(|location| catalog.effective_settings(location).default_win_probability);
        let base = reward.win_probability.or(location_default).unwrap_or(0.0);

        match golden_hour {
            Some(gh) if gh.location_id == reward.location_id && gh.is_active(catalog, now) => {
                base * gh.win_probability_multiplier
            }
            _ => base,
        }
    }

    /// `reward_ids` 中当前可用奖品的 (id, 权重)，按 id 升序
    pub fn candidates(
        &self,
        catalog: &CampaignCatalog,
        reward_ids: &[i64],
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
    ) -> Vec<(i64, f64)> {
        let mut ids = reward_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| catalog.reward(id).ok())
            .filter(|reward| reward.is_active(catalog, now))
            .map(|reward| (reward.id, self.weigh(catalog, reward, golden_hour, now)))
            .collect()
    }

    /// 给定 r ∈ [0,1) 的确定性抽签
    pub fn pick(&self, candidates: &[(i64, f64)], draw: f64) -> SpinOutcome {
        let total: f64 = candidates.iter().map(|(_, w)| w).sum();
        let scale = match self.mode {
            WeightingMode::Normalized if total.is_finite() && total > 1.0 => total,
            _ => 1.0,
        };

        let mut cumulative = 0.0;
        for &(reward_id, weight) in candidates {
            let weight = weight / scale;
            cumulative += weight;
            // NaN 永远不满足 >，自然落入未中奖
            if cumulative > draw {
                return SpinOutcome::Win {
                    reward_id,
                    probability: weight,
                };
            }
        }
        SpinOutcome::Loss
    }

    pub fn select_with_draw(
        &self,
        catalog: &CampaignCatalog,
        reward_ids: &[i64],
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
        draw: f64,
    ) -> SpinOutcome {
        let candidates = self.candidates(catalog, reward_ids, golden_hour, now);
        if candidates.is_empty() {
            return SpinOutcome::Loss;
        }
        self.pick(&candidates, draw)
    }

    pub fn select_outcome<R: Rng + ?Sized>(
        &self,
        catalog: &CampaignCatalog,
        reward_ids: &[i64],
        golden_hour: Option<&GoldenHour>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SpinOutcome {
        let draw: f64 = rng.gen_range(0.0..1.0);
        log::debug!("Spin draw r={draw:.6} over {} rewards", reward_ids.len());
        self.select_with_draw(catalog, reward_ids, golden_hour, now, draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::*;
    use crate::models::status::deactivate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn catalog_with(probabilities: &[f64]) -> (CampaignCatalog, Vec<i64>) {
        let mut catalog = campaign();
        let mut ids = Vec::new();
        for (i, p) in probabilities.iter().enumerate() {
            let id = i as i64 + 1;
            catalog
                .insert_reward(reward(id, LOCATION_ID, *p, 1_000_000))
                .unwrap();
            ids.push(id);
        }
        (catalog, ids)
    }

    #[test]
    fn test_empty_input_is_loss() {
        let catalog = campaign();
        let selector = RewardSelector::default();
        assert_eq!(
            selector.select_with_draw(&catalog, &[], None, now(), 0.0),
            SpinOutcome::Loss
        );
    }

    #[test]
    fn test_draw_walks_ids_in_order() {
        // 0.25 与 0.5 在二进制下精确，累计边界不受舍入影响
        let (catalog, ids) = catalog_with(&[0.25, 0.25]);
        let selector = RewardSelector::default();
        let reversed: Vec<i64> = ids.iter().rev().copied().collect();
        assert_eq!(
            selector
                .select_with_draw(&catalog, &reversed, None, now(), 0.05)
                .reward_id(),
            Some(1)
        );
        assert_eq!(
            selector
                .select_with_draw(&catalog, &ids, None, now(), 0.25)
                .reward_id(),
            Some(2)
        );
        assert_eq!(
            selector.select_with_draw(&catalog, &ids, None, now(), 0.5),
            SpinOutcome::Loss
        );
        assert_eq!(
            selector.select_with_draw(&catalog, &ids, None, now(), 0.75),
            SpinOutcome::Loss
        );
    }

    #[test]
    fn test_inactive_rewards_are_skipped() {
        let (mut catalog, ids) = catalog_with(&[0.5, 0.5]);
        deactivate(&mut catalog.reward_mut(1).unwrap().status, now()).unwrap();
        assert_eq!(
            RewardSelector::default()
                .select_with_draw(&catalog, &ids, None, now(), 0.2)
                .reward_id(),
            Some(2)
        );
    }

    #[test]
    fn test_null_probability_uses_location_default() {
        let (mut catalog, ids) = catalog_with(&[0.0]);
        catalog.reward_mut(1).unwrap().win_probability = None;
        let selector = RewardSelector::default();
        let reward = catalog.reward(1).unwrap();
        assert!((selector.weigh(&catalog, reward, None, now()) - 0.1).abs() < 1e-12);

        catalog.window_mut(WINDOW_ID).unwrap().settings.default_win_probability = None;
        let reward = catalog.reward(1).unwrap();
        assert_eq!(selector.weigh(&catalog, reward, None, now()), 0.0);
        assert_eq!(
            selector.select_with_draw(&catalog, &ids, None, now(), 0.0),
            SpinOutcome::Loss
        );
    }

    #[test]
    fn test_golden_hour_multiplies_weight() {
        let (mut catalog, ids) = catalog_with(&[0.2]);
        catalog
            .insert_golden_hour(golden_hour(9, LOCATION_ID, 2.0))
            .unwrap();
        let selector = RewardSelector::default();
        let gh = catalog.golden_hour(9).unwrap();
        let reward = catalog.reward(1).unwrap();
        assert!((selector.weigh(&catalog, reward, Some(gh), now()) - 0.4).abs() < 1e-12);

        // r=0.3 赢得奖品（无黄金时段时为未中奖）
        assert!(selector
            .select_with_draw(&catalog, &ids, Some(gh), now(), 0.3)
            .is_win());
        assert!(!selector
            .select_with_draw(&catalog, &ids, None, now(), 0.3)
            .is_win());

        // 时段外不加成
        let later = now() + chrono::Duration::hours(2);
        assert!((selector.weigh(&catalog, reward, Some(gh), later) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_golden_hour_of_other_location_ignored() {
        let (mut catalog, _) = catalog_with(&[0.2]);
        catalog
            .attach_location(crate::models::Location::new(11, "other", WINDOW_ID, None))
            .unwrap();
        catalog.insert_golden_hour(golden_hour(9, 11, 3.0)).unwrap();
        let selector = RewardSelector::default();
        let gh = catalog.golden_hour(9).unwrap();
        let reward = catalog.reward(1).unwrap();
        assert!((selector.weigh(&catalog, reward, Some(gh), now()) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_weights_do_not_panic() {
        let selector = RewardSelector::default();
        assert_eq!(selector.pick(&[(1, f64::NAN), (2, 0.5)], 0.1), SpinOutcome::Loss);
        assert_eq!(selector.pick(&[(1, f64::INFINITY)], 0.9).reward_id(), Some(1));
        assert_eq!(selector.pick(&[(1, f64::NEG_INFINITY), (2, 0.5)], 0.1), SpinOutcome::Loss);

        let normalized = RewardSelector::new(WeightingMode::Normalized);
        assert_eq!(normalized.pick(&[(1, f64::NAN)], 0.1), SpinOutcome::Loss);
        assert_eq!(normalized.pick(&[(1, f64::INFINITY)], 0.1).reward_id(), Some(1));
    }

    #[test]
    fn test_sum_over_one_raw_vs_normalized() {
        let candidates = [(1, 0.7), (2, 0.7), (3, 0.7)];
        let raw = RewardSelector::new(WeightingMode::Raw);
        // 第三个奖品在 Raw 模式下不可达
        assert_eq!(raw.pick(&candidates, 0.99).reward_id(), Some(2));
        assert_eq!(raw.pick(&candidates, 0.69).reward_id(), Some(1));

        let normalized = RewardSelector::new(WeightingMode::Normalized);
        assert_eq!(normalized.pick(&candidates, 0.99).reward_id(), Some(3));
        assert_eq!(normalized.pick(&candidates, 0.5).reward_id(), Some(2));

        // Σ≤1 时两种模式一致
        let small = [(1, 0.2), (2, 0.3)];
        for draw in [0.0, 0.19, 0.2, 0.49, 0.5, 0.99] {
            assert_eq!(raw.pick(&small, draw), normalized.pick(&small, draw));
        }
    }

    #[test]
    fn test_statistical_convergence() {
        let (catalog, ids) = catalog_with(&[0.1, 0.2, 0.3]);
        let selector = RewardSelector::default();
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 100_000;

        let mut wins: HashMap<i64, usize> = HashMap::new();
        let mut losses = 0usize;
        for _ in 0..draws {
            match selector.select_outcome(&catalog, &ids, None, now(), &mut rng) {
                SpinOutcome::Win { reward_id, .. } => *wins.entry(reward_id).or_default() += 1,
                SpinOutcome::Loss => losses += 1,
            }
        }

        let freq = |n: usize| n as f64 / draws as f64;
        for (id, expected) in [(1, 0.1), (2, 0.2), (3, 0.3)] {
            let observed = freq(wins.get(&id).copied().unwrap_or(0));
            assert!(
                (observed - expected).abs() < 0.01,
                "reward {id}: observed {observed}, expected {expected}"
            );
        }
        assert!((freq(losses) - 0.4).abs() < 0.01);
    }
}
