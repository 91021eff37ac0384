//! Additive evolution: notes and bookmarks tables, RAW preview quality,
//! Live Photo pairing flags, video proxies, and ref-point alternate names.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn add_column_if_missing(
    manager: &SchemaManager<'_>,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<(), DbErr> {
    if !manager.has_column(table, column).await? {
        manager
            .get_connection()
            .execute_unprepared(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))
            .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notes::NoteId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notes::Locid).uuid().not_null())
                    .col(ColumnDef::new(Notes::Body).string().not_null())
                    .col(ColumnDef::new(Notes::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Notes::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Notes::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notes_locid")
                            .from(Notes::Table, Notes::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookmarks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookmarks::BookmarkId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bookmarks::Url).string().not_null())
                    .col(ColumnDef::new(Bookmarks::Title).string())
                    .col(ColumnDef::new(Bookmarks::Locid).uuid())
                    .col(ColumnDef::new(Bookmarks::AddedBy).string().not_null())
                    .col(ColumnDef::new(Bookmarks::AddedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookmarks_locid")
                            .from(Bookmarks::Table, Bookmarks::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        add_column_if_missing(manager, "images", "preview_quality", "TEXT").await?;
        add_column_if_missing(
            manager,
            "images",
            "is_live_photo",
            "BOOLEAN NOT NULL DEFAULT FALSE",
        )
        .await?;
        add_column_if_missing(
            manager,
            "videos",
            "is_live_photo",
            "BOOLEAN NOT NULL DEFAULT FALSE",
        )
        .await?;
        add_column_if_missing(manager, "videos", "proxy_path", "TEXT").await?;
        add_column_if_missing(manager, "ref_map_points", "aka_names", "TEXT").await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookmarks")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS notes")
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Locid,
}

#[derive(DeriveIden)]
enum Notes {
    Table,
    NoteId,
    Locid,
    Body,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Bookmarks {
    Table,
    BookmarkId,
    Url,
    Title,
    Locid,
    AddedBy,
    AddedAt,
}
