//! Fixity record entity. Rows are immutable once written.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fixity_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub check_id: Uuid,
    pub media_sha: String,
    pub media_type: String,
    pub file_path: String,
    pub checked_at: DateTimeUtc,
    pub checked_by: String,
    pub expected_hash: String,
    pub actual_hash: Option<String>,
    pub status: String,
    pub actual_size: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
