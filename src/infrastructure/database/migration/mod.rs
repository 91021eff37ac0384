//! Database migrations
//!
//! All migrations are additive; destructive changes are done by copying to a
//! new table and swapping inside one transaction.

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_initial_tables;
mod m20250605_000001_create_job_queues;
mod m20250612_000001_create_reference_layer;
mod m20250620_000001_add_notes_and_media_flags;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_initial_tables::Migration),
            Box::new(m20250605_000001_create_job_queues::Migration),
            Box::new(m20250612_000001_create_reference_layer::Migration),
            Box::new(m20250620_000001_add_notes_and_media_flags::Migration),
        ]
    }
}
