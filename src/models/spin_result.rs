use serde::{Deserialize, Serialize};
use std::fmt;

use super::SpinHistory;

/// 实体不可用的原因（代替在判定函数里打印日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveReason {
    StatusNotActive,
    /// start/end 未配置，视为"尚未配置好"
    MissingSchedule,
    NotStarted,
    Ended,
    /// 依赖的上级实体不存在
    MissingReference,
    WindowInactive,
    RegionInactive,
    LocationInactive,
    ParticipantInactive,
    OutOfStock,
    DailyLimitReached,
    UsageLimitReached,
}

impl fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InactiveReason::StatusNotActive => "status is not active",
            InactiveReason::MissingSchedule => "schedule is not configured",
            InactiveReason::NotStarted => "not started yet",
            InactiveReason::Ended => "already ended",
            InactiveReason::MissingReference => "required reference is missing",
            InactiveReason::WindowInactive => "event is not active",
            InactiveReason::RegionInactive => "region is not active",
            InactiveReason::LocationInactive => "location is not active",
            InactiveReason::ParticipantInactive => "participant is not active",
            InactiveReason::OutOfStock => "out of stock",
            InactiveReason::DailyLimitReached => "daily limit reached",
            InactiveReason::UsageLimitReached => "usage limit reached",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    Active,
    Inactive(InactiveReason),
}

impl Eligibility {
    pub fn is_active(&self) -> bool {
        matches!(self, Eligibility::Active)
    }
}

/// 一次抽签的结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SpinOutcome {
    Win {
        reward_id: i64,
        /// 抽签时使用的有效权重
        probability: f64,
    },
    Loss,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        matches!(self, SpinOutcome::Win { .. })
    }

    pub fn reward_id(&self) -> Option<i64> {
        match self {
            SpinOutcome::Win { reward_id, .. } => Some(*reward_id),
            SpinOutcome::Loss => None,
        }
    }
}

/// 当前不能抽奖的原因（业务结果，不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "denial", rename_all = "snake_case")]
pub enum SpinDenial {
    Ineligible { reason: InactiveReason },
    NoRemainingSpins,
    DailyCapReached { cap: i64 },
}

impl fmt::Display for SpinDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinDenial::Ineligible { reason } => write!(f, "participant event inactive: {reason}"),
            SpinDenial::NoRemainingSpins => write!(f, "no remaining spins"),
            SpinDenial::DailyCapReached { cap } => write!(f, "daily spin cap of {cap} reached"),
        }
    }
}

/// 抽奖完成后的回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinReceipt {
    pub outcome: SpinOutcome,
    pub history: SpinHistory,
    /// 剩余抽奖次数
    pub remaining_spins: i64,
    /// 选奖+扣库存共尝试的轮数
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpinDecision {
    Completed(SpinReceipt),
    NotAllowed(SpinDenial),
}
