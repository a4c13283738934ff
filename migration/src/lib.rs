pub use sea_orm_migration::prelude::*;

mod m20251016_000001_add_reward_inventory;
mod m20251016_000002_add_participant_events;
mod m20251016_000003_add_spin_histories;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251016_000001_add_reward_inventory::Migration),
            Box::new(m20251016_000002_add_participant_events::Migration),
            Box::new(m20251016_000003_add_spin_histories::Migration),
        ]
    }
}
