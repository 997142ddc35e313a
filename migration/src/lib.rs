pub use sea_orm_migration::prelude::*;

mod m20251116_120000_crm_core;
mod m20251117_150000_pipeline_stage;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251116_120000_crm_core::Migration),
            Box::new(m20251117_150000_pipeline_stage::Migration),
        ]
    }
}
