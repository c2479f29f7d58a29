use sea_orm_migration::prelude::*;

mod m20250412_000001_create_events_tables;
mod m20250506_000001_create_pipeline_jobs;
mod m20250520_000001_add_lead_count_to_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250412_000001_create_events_tables::Migration),
            Box::new(m20250506_000001_create_pipeline_jobs::Migration),
            Box::new(m20250520_000001_add_lead_count_to_events::Migration),
        ]
    }
}
