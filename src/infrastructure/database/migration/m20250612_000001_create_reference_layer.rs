//! Reference maps, their points, and duplicate exclusions

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReferenceMaps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReferenceMaps::MapId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ReferenceMaps::Name).string().not_null())
                    .col(ColumnDef::new(ReferenceMaps::SourceFile).string().not_null())
                    .col(ColumnDef::new(ReferenceMaps::Format).string().not_null())
                    .col(ColumnDef::new(ReferenceMaps::PointCount).integer().not_null().default(0))
                    .col(ColumnDef::new(ReferenceMaps::ImportedBy).string().not_null())
                    .col(ColumnDef::new(ReferenceMaps::ImportedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RefMapPoints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RefMapPoints::PointId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(RefMapPoints::MapId).uuid().not_null())
                    .col(ColumnDef::new(RefMapPoints::Name).string().not_null())
                    .col(ColumnDef::new(RefMapPoints::Description).string())
                    .col(ColumnDef::new(RefMapPoints::Lat).double().not_null())
                    .col(ColumnDef::new(RefMapPoints::Lng).double().not_null())
                    .col(ColumnDef::new(RefMapPoints::State).string_len(2))
                    .col(ColumnDef::new(RefMapPoints::Category).string())
                    .col(ColumnDef::new(RefMapPoints::RawMetadata).json())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ref_map_points_map")
                            .from(RefMapPoints::Table, RefMapPoints::MapId)
                            .to(ReferenceMaps::Table, ReferenceMaps::MapId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ref_map_points_map")
                    .table(RefMapPoints::Table)
                    .col(RefMapPoints::MapId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DuplicateExclusions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DuplicateExclusions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DuplicateExclusions::NameA).string().not_null())
                    .col(ColumnDef::new(DuplicateExclusions::NameB).string().not_null())
                    .col(ColumnDef::new(DuplicateExclusions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(DuplicateExclusions::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_duplicate_exclusions_pair")
                    .table(DuplicateExclusions::Table)
                    .col(DuplicateExclusions::NameA)
                    .col(DuplicateExclusions::NameB)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["duplicate_exclusions", "ref_map_points", "reference_maps"] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ReferenceMaps {
    Table,
    MapId,
    Name,
    SourceFile,
    Format,
    PointCount,
    ImportedBy,
    ImportedAt,
}

#[derive(DeriveIden)]
enum RefMapPoints {
    Table,
    PointId,
    MapId,
    Name,
    Description,
    Lat,
    Lng,
    State,
    Category,
    RawMetadata,
}

#[derive(DeriveIden)]
enum DuplicateExclusions {
    Table,
    Id,
    NameA,
    NameB,
    CreatedBy,
    CreatedAt,
}
