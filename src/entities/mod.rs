pub mod participant_events;
pub mod rewards;
pub mod spin_histories;

pub use participant_events as participant_event_entity;
pub use rewards as reward_entity;
pub use spin_histories as spin_history_entity;
