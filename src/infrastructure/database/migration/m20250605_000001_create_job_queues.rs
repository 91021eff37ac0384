//! Durable job queue and dead-letter tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::JobId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::Queue).string().not_null())
                    .col(ColumnDef::new(Jobs::Payload).json().not_null())
                    .col(ColumnDef::new(Jobs::State).string().not_null())
                    .col(ColumnDef::new(Jobs::Attempts).integer().not_null().default(0))
                    .col(ColumnDef::new(Jobs::MaxAttempts).integer().not_null())
                    .col(ColumnDef::new(Jobs::NextAttemptAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Jobs::ClaimedBy).string())
                    .col(ColumnDef::new(Jobs::ClaimedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::HeartbeatAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::CancelRequested).boolean().not_null().default(false))
                    .col(ColumnDef::new(Jobs::LastError).string())
                    .col(ColumnDef::new(Jobs::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Jobs::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Claim query: oldest pending job per queue whose retry time has come.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_jobs_claim")
                    .table(Jobs::Table)
                    .col(Jobs::Queue)
                    .col(Jobs::State)
                    .col(Jobs::NextAttemptAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DeadLetters::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DeadLetters::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DeadLetters::OriginalJobId).uuid().not_null())
                    .col(ColumnDef::new(DeadLetters::Queue).string().not_null())
                    .col(ColumnDef::new(DeadLetters::Payload).json().not_null())
                    .col(ColumnDef::new(DeadLetters::FailedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(DeadLetters::Error).string().not_null())
                    .col(ColumnDef::new(DeadLetters::Acknowledged).boolean().not_null().default(false))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS dead_letters")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS jobs")
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    JobId,
    Queue,
    Payload,
    State,
    Attempts,
    MaxAttempts,
    NextAttemptAt,
    ClaimedBy,
    ClaimedAt,
    HeartbeatAt,
    CancelRequested,
    LastError,
    CreatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum DeadLetters {
    Table,
    Id,
    OriginalJobId,
    Queue,
    Payload,
    FailedAt,
    Error,
    Acknowledged,
}
