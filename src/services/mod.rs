pub mod eligibility;
pub mod overlap;
pub mod quantity_ledger;
pub mod reward_selector;
pub mod spin_budget;
pub mod spin_service;

pub use eligibility::{Eligible, find_usable_golden_hour};
pub use overlap::{OverlapCheck, OverlapValidator};
pub use quantity_ledger::QuantityLedger;
pub use reward_selector::RewardSelector;
pub use spin_budget::SpinBudgetTracker;
pub use spin_service::SpinService;
