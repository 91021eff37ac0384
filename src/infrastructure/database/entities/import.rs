//! Import session entity
//!
//! Sessions are an audit trail: rows are never deleted. `status` drives
//! resumability after a crash.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "imports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub import_id: Uuid,
    pub locid: Uuid,
    pub subid: Option<Uuid>,
    pub status: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub auth_imp: String,

    pub image_count: i32,
    pub video_count: i32,
    pub document_count: i32,
    pub map_count: i32,
    pub duplicate_count: i32,
    pub error_count: i32,

    pub delete_originals: bool,
    pub use_hardlinks: bool,
    pub verify_checksums: bool,

    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::Locid",
        to = "super::location::Column::Locid"
    )]
    Location,
    #[sea_orm(has_many = "super::planned_file::Entity")]
    PlannedFiles,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::planned_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlannedFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
