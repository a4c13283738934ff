use crate::models::{CampaignCatalog, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapCheck {
    Ok,
    /// 与之重叠的已挂载地点 id
    Conflict(i64),
}

impl OverlapCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, OverlapCheck::Ok)
    }
}

/// 同一活动下任意两个地点的省份集合不得相交
pub struct OverlapValidator;

impl OverlapValidator {
    /// 将候选地点的省份集合与 `existing` 中其它地点逐一比较
    /// 跳过候选地点自身 id，已挂载的地点可以重复校验
    pub fn check_no_overlap<'a>(
        catalog: &CampaignCatalog,
        candidate: &Location,
        existing: impl IntoIterator<Item = &'a Location>,
    ) -> OverlapCheck {
        let Some(provinces) = catalog.provinces_of(candidate) else {
            return OverlapCheck::Ok;
        };
        if provinces.is_empty() {
            return OverlapCheck::Ok;
        }

        for other in existing {
            if other.id == candidate.id || other.window_id != candidate.window_id {
                continue;
            }
            if let Some(theirs) = catalog.provinces_of(other)
                && !provinces.is_disjoint(theirs)
            {
                return OverlapCheck::Conflict(other.id);
            }
        }
        OverlapCheck::Ok
    }
}
