//! Per-file pipeline state within an import session
//!
//! Each checkpoint advances `state`; resume re-drives every file from its
//! recorded state, which is safe because each step is idempotent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "planned_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub import_id: Uuid,
    pub source_path: String,
    /// Filename stem, used to associate sidecars with their principal.
    pub stem: String,
    pub kind: String,
    pub state: String,
    pub sha256: Option<String>,
    pub file_size: Option<i64>,
    pub archived_path: Option<String>,
    pub sidecar_of: Option<String>,
    pub warnings_json: Option<Json>,
    pub error_message: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::import::Entity",
        from = "Column::ImportId",
        to = "super::import::Column::ImportId",
        on_delete = "Cascade"
    )]
    Import,
}

impl Related<super::import::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Import.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
