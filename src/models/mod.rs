pub mod campaign;
pub mod catalog;
pub mod golden_hour;
pub mod participant_event;
pub mod reward;
pub mod spin_result;
pub mod status;

#[cfg(test)]
pub(crate) mod fixtures;

pub use campaign::*;
pub use catalog::CampaignCatalog;
pub use golden_hour::*;
pub use participant_event::*;
pub use reward::*;
pub use spin_result::*;
pub use status::{Status, StatusCode};
