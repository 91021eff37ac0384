//! Initial schema: locations, sub-locations, media tables, imports,
//! planned files and fixity history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Locations::Locid).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Locations::Loc12).string_len(12).not_null().unique_key())
                    .col(ColumnDef::new(Locations::Locnam).string().not_null())
                    .col(ColumnDef::new(Locations::Akanam).string())
                    .col(ColumnDef::new(Locations::HistoricalName).string())
                    .col(ColumnDef::new(Locations::LocType).string())
                    .col(ColumnDef::new(Locations::LocStype).string())
                    .col(ColumnDef::new(Locations::GpsLat).double())
                    .col(ColumnDef::new(Locations::GpsLng).double())
                    .col(ColumnDef::new(Locations::GpsAccuracyM).double())
                    .col(ColumnDef::new(Locations::GpsSource).string())
                    .col(ColumnDef::new(Locations::GpsVerifiedOnMap).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::GpsCapturedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Locations::GeocodeTier).string())
                    .col(ColumnDef::new(Locations::GeocodeQuery).string())
                    .col(ColumnDef::new(Locations::AddressStreet).string())
                    .col(ColumnDef::new(Locations::AddressCity).string())
                    .col(ColumnDef::new(Locations::AddressCounty).string())
                    .col(ColumnDef::new(Locations::AddressState).string_len(2))
                    .col(ColumnDef::new(Locations::AddressZipcode).string())
                    .col(ColumnDef::new(Locations::AddressConfidence).string())
                    .col(ColumnDef::new(Locations::AddressGeocodedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Locations::AddressRaw).string())
                    .col(ColumnDef::new(Locations::AddressNormalized).string())
                    .col(ColumnDef::new(Locations::AddressParsedJson).json())
                    .col(ColumnDef::new(Locations::CensusRegion).string())
                    .col(ColumnDef::new(Locations::CensusDivision).string())
                    .col(ColumnDef::new(Locations::StateDirection).string())
                    .col(ColumnDef::new(Locations::CulturalRegion).string())
                    .col(ColumnDef::new(Locations::CulturalRegionUserSet).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::Documentation).string())
                    .col(ColumnDef::new(Locations::Access).string())
                    .col(ColumnDef::new(Locations::Historic).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::Favorite).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::Project).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::DocInterior).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::DocExterior).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::DocDrone).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::DocWebHistory).boolean().not_null().default(false))
                    .col(ColumnDef::new(Locations::BuiltYear).integer())
                    .col(ColumnDef::new(Locations::AbandonedYear).integer())
                    .col(ColumnDef::new(Locations::HeroImgsha).string())
                    .col(ColumnDef::new(Locations::AuthImp).string().not_null())
                    .col(ColumnDef::new(Locations::Locadd).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Locations::Locup).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_locations_state")
                    .table(Locations::Table)
                    .col(Locations::AddressState)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_locations_type")
                    .table(Locations::Table)
                    .col(Locations::LocType)
                    .to_owned(),
            )
            .await?;

        // Partial GPS index; sea-query has no WHERE clause builder for
        // indexes, so raw SQL it is.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_locations_gps \
                 ON locations (gps_lat, gps_lng) WHERE gps_lat IS NOT NULL",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubLocations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SubLocations::Subid).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SubLocations::Sub12).string_len(12).not_null().unique_key())
                    .col(ColumnDef::new(SubLocations::Locid).uuid().not_null())
                    .col(ColumnDef::new(SubLocations::Subnam).string().not_null())
                    .col(ColumnDef::new(SubLocations::Ssubname).string())
                    .col(ColumnDef::new(SubLocations::SubType).string())
                    .col(ColumnDef::new(SubLocations::Status).string())
                    .col(ColumnDef::new(SubLocations::HeroImgsha).string())
                    .col(ColumnDef::new(SubLocations::IsPrimary).boolean().not_null().default(false))
                    .col(ColumnDef::new(SubLocations::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SubLocations::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sub_locations_locid")
                            .from(SubLocations::Table, SubLocations::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sub_locations_name_per_loc")
                    .table(SubLocations::Table)
                    .col(SubLocations::Subnam)
                    .col(SubLocations::Locid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Images::Imghash).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(Images::OriginalName).string().not_null())
                    .col(ColumnDef::new(Images::OriginalPath).string().not_null())
                    .col(ColumnDef::new(Images::ArchivedPath).string().not_null())
                    .col(ColumnDef::new(Images::Locid).uuid())
                    .col(ColumnDef::new(Images::Subid).uuid())
                    .col(ColumnDef::new(Images::ImportId).uuid())
                    .col(ColumnDef::new(Images::Imgadd).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Images::ExifJson).json())
                    .col(ColumnDef::new(Images::Width).integer())
                    .col(ColumnDef::new(Images::Height).integer())
                    .col(ColumnDef::new(Images::DateTaken).timestamp_with_time_zone())
                    .col(ColumnDef::new(Images::CameraMake).string())
                    .col(ColumnDef::new(Images::CameraModel).string())
                    .col(ColumnDef::new(Images::GpsLat).double())
                    .col(ColumnDef::new(Images::GpsLng).double())
                    .col(ColumnDef::new(Images::ThumbPathSm).string())
                    .col(ColumnDef::new(Images::ThumbPathLg).string())
                    .col(ColumnDef::new(Images::PreviewPath).string())
                    .col(ColumnDef::new(Images::XmpSynced).boolean().not_null().default(false))
                    .col(ColumnDef::new(Images::Hidden).boolean().not_null().default(false))
                    .col(ColumnDef::new(Images::HiddenReason).string())
                    .col(ColumnDef::new(Images::FileSizeBytes).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_locid")
                            .from(Images::Table, Images::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_subid")
                            .from(Images::Table, Images::Subid)
                            .to(SubLocations::Table, SubLocations::Subid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_images_locid")
                    .table(Images::Table)
                    .col(Images::Locid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_images_subid")
                    .table(Images::Table)
                    .col(Images::Subid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Videos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Videos::Vidhash).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(Videos::OriginalName).string().not_null())
                    .col(ColumnDef::new(Videos::OriginalPath).string().not_null())
                    .col(ColumnDef::new(Videos::ArchivedPath).string().not_null())
                    .col(ColumnDef::new(Videos::Locid).uuid())
                    .col(ColumnDef::new(Videos::Subid).uuid())
                    .col(ColumnDef::new(Videos::ImportId).uuid())
                    .col(ColumnDef::new(Videos::Vidadd).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Videos::ProbeJson).json())
                    .col(ColumnDef::new(Videos::DurationS).double())
                    .col(ColumnDef::new(Videos::Width).integer())
                    .col(ColumnDef::new(Videos::Height).integer())
                    .col(ColumnDef::new(Videos::Codec).string())
                    .col(ColumnDef::new(Videos::Fps).double())
                    .col(ColumnDef::new(Videos::DateTaken).timestamp_with_time_zone())
                    .col(ColumnDef::new(Videos::GpsLat).double())
                    .col(ColumnDef::new(Videos::GpsLng).double())
                    .col(ColumnDef::new(Videos::ThumbPathSm).string())
                    .col(ColumnDef::new(Videos::ThumbPathLg).string())
                    .col(ColumnDef::new(Videos::PosterExtracted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Videos::Hidden).boolean().not_null().default(false))
                    .col(ColumnDef::new(Videos::HiddenReason).string())
                    .col(ColumnDef::new(Videos::FileSizeBytes).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_locid")
                            .from(Videos::Table, Videos::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_subid")
                            .from(Videos::Table, Videos::Subid)
                            .to(SubLocations::Table, SubLocations::Subid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_videos_locid")
                    .table(Videos::Table)
                    .col(Videos::Locid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Documents::Dochash).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(Documents::OriginalName).string().not_null())
                    .col(ColumnDef::new(Documents::OriginalPath).string().not_null())
                    .col(ColumnDef::new(Documents::ArchivedPath).string().not_null())
                    .col(ColumnDef::new(Documents::Locid).uuid())
                    .col(ColumnDef::new(Documents::Subid).uuid())
                    .col(ColumnDef::new(Documents::ImportId).uuid())
                    .col(ColumnDef::new(Documents::Docadd).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Documents::PageCount).integer())
                    .col(ColumnDef::new(Documents::Author).string())
                    .col(ColumnDef::new(Documents::Title).string())
                    .col(ColumnDef::new(Documents::Hidden).boolean().not_null().default(false))
                    .col(ColumnDef::new(Documents::HiddenReason).string())
                    .col(ColumnDef::new(Documents::FileSizeBytes).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_locid")
                            .from(Documents::Table, Documents::Locid)
                            .to(Locations::Table, Locations::Locid)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_documents_locid")
                    .table(Documents::Table)
                    .col(Documents::Locid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Imports::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Imports::ImportId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Imports::Locid).uuid().not_null())
                    .col(ColumnDef::new(Imports::Subid).uuid())
                    .col(ColumnDef::new(Imports::Status).string().not_null())
                    .col(ColumnDef::new(Imports::StartedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Imports::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Imports::AuthImp).string().not_null())
                    .col(ColumnDef::new(Imports::ImageCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::VideoCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::DocumentCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::MapCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::DuplicateCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::ErrorCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Imports::DeleteOriginals).boolean().not_null().default(false))
                    .col(ColumnDef::new(Imports::UseHardlinks).boolean().not_null().default(false))
                    .col(ColumnDef::new(Imports::VerifyChecksums).boolean().not_null().default(true))
                    .col(ColumnDef::new(Imports::Notes).string())
                    // No FK on locid: sessions are an audit trail and must
                    // survive deletion of the location they fed.
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_imports_started_at")
                    .table(Imports::Table)
                    .col((Imports::StartedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlannedFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlannedFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlannedFiles::ImportId).uuid().not_null())
                    .col(ColumnDef::new(PlannedFiles::SourcePath).string().not_null())
                    .col(ColumnDef::new(PlannedFiles::Stem).string().not_null())
                    .col(ColumnDef::new(PlannedFiles::Kind).string().not_null())
                    .col(ColumnDef::new(PlannedFiles::State).string().not_null())
                    .col(ColumnDef::new(PlannedFiles::Sha256).string_len(64))
                    .col(ColumnDef::new(PlannedFiles::FileSize).big_integer())
                    .col(ColumnDef::new(PlannedFiles::ArchivedPath).string())
                    .col(ColumnDef::new(PlannedFiles::SidecarOf).string())
                    .col(ColumnDef::new(PlannedFiles::WarningsJson).json())
                    .col(ColumnDef::new(PlannedFiles::ErrorMessage).string())
                    .col(ColumnDef::new(PlannedFiles::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_planned_files_import")
                            .from(PlannedFiles::Table, PlannedFiles::ImportId)
                            .to(Imports::Table, Imports::ImportId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_planned_files_session")
                    .table(PlannedFiles::Table)
                    .col(PlannedFiles::ImportId)
                    .col(PlannedFiles::SourcePath)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FixityRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FixityRecords::CheckId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FixityRecords::MediaSha).string_len(64).not_null())
                    .col(ColumnDef::new(FixityRecords::MediaType).string().not_null())
                    .col(ColumnDef::new(FixityRecords::FilePath).string().not_null())
                    .col(ColumnDef::new(FixityRecords::CheckedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(FixityRecords::CheckedBy).string().not_null())
                    .col(ColumnDef::new(FixityRecords::ExpectedHash).string_len(64).not_null())
                    .col(ColumnDef::new(FixityRecords::ActualHash).string())
                    .col(ColumnDef::new(FixityRecords::Status).string().not_null())
                    .col(ColumnDef::new(FixityRecords::ActualSize).big_integer())
                    .col(ColumnDef::new(FixityRecords::ErrorMessage).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_fixity_sha_checked")
                    .table(FixityRecords::Table)
                    .col(FixityRecords::MediaSha)
                    .col((FixityRecords::CheckedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "fixity_records",
            "planned_files",
            "imports",
            "documents",
            "videos",
            "images",
            "sub_locations",
            "locations",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Locid,
    Loc12,
    Locnam,
    Akanam,
    HistoricalName,
    LocType,
    LocStype,
    GpsLat,
    GpsLng,
    GpsAccuracyM,
    GpsSource,
    GpsVerifiedOnMap,
    GpsCapturedAt,
    GeocodeTier,
    GeocodeQuery,
    AddressStreet,
    AddressCity,
    AddressCounty,
    AddressState,
    AddressZipcode,
    AddressConfidence,
    AddressGeocodedAt,
    AddressRaw,
    AddressNormalized,
    AddressParsedJson,
    CensusRegion,
    CensusDivision,
    StateDirection,
    CulturalRegion,
    CulturalRegionUserSet,
    Documentation,
    Access,
    Historic,
    Favorite,
    Project,
    DocInterior,
    DocExterior,
    DocDrone,
    DocWebHistory,
    BuiltYear,
    AbandonedYear,
    HeroImgsha,
    AuthImp,
    Locadd,
    Locup,
}

#[derive(DeriveIden)]
enum SubLocations {
    Table,
    Subid,
    Sub12,
    Locid,
    Subnam,
    Ssubname,
    SubType,
    Status,
    HeroImgsha,
    IsPrimary,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Images {
    Table,
    Imghash,
    OriginalName,
    OriginalPath,
    ArchivedPath,
    Locid,
    Subid,
    ImportId,
    Imgadd,
    ExifJson,
    Width,
    Height,
    DateTaken,
    CameraMake,
    CameraModel,
    GpsLat,
    GpsLng,
    ThumbPathSm,
    ThumbPathLg,
    PreviewPath,
    XmpSynced,
    Hidden,
    HiddenReason,
    FileSizeBytes,
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Vidhash,
    OriginalName,
    OriginalPath,
    ArchivedPath,
    Locid,
    Subid,
    ImportId,
    Vidadd,
    ProbeJson,
    DurationS,
    Width,
    Height,
    Codec,
    Fps,
    DateTaken,
    GpsLat,
    GpsLng,
    ThumbPathSm,
    ThumbPathLg,
    PosterExtracted,
    Hidden,
    HiddenReason,
    FileSizeBytes,
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Dochash,
    OriginalName,
    OriginalPath,
    ArchivedPath,
    Locid,
    Subid,
    ImportId,
    Docadd,
    PageCount,
    Author,
    Title,
    Hidden,
    HiddenReason,
    FileSizeBytes,
}

#[derive(DeriveIden)]
enum Imports {
    Table,
    ImportId,
    Locid,
    Subid,
    Status,
    StartedAt,
    CompletedAt,
    AuthImp,
    ImageCount,
    VideoCount,
    DocumentCount,
    MapCount,
    DuplicateCount,
    ErrorCount,
    DeleteOriginals,
    UseHardlinks,
    VerifyChecksums,
    Notes,
}

#[derive(DeriveIden)]
enum PlannedFiles {
    Table,
    Id,
    ImportId,
    SourcePath,
    Stem,
    Kind,
    State,
    Sha256,
    FileSize,
    ArchivedPath,
    SidecarOf,
    WarningsJson,
    ErrorMessage,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FixityRecords {
    Table,
    CheckId,
    MediaSha,
    MediaType,
    FilePath,
    CheckedAt,
    CheckedBy,
    ExpectedHash,
    ActualHash,
    Status,
    ActualSize,
    ErrorMessage,
}
