//! Video media entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "videos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub vidhash: String,
    pub original_name: String,
    pub original_path: String,
    pub archived_path: String,
    pub locid: Option<Uuid>,
    pub subid: Option<Uuid>,
    pub import_id: Option<Uuid>,
    pub vidadd: DateTimeUtc,

    pub probe_json: Option<Json>,
    pub duration_s: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub codec: Option<String>,
    pub fps: Option<f64>,
    pub date_taken: Option<DateTimeUtc>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,

    pub thumb_path_sm: Option<String>,
    pub thumb_path_lg: Option<String>,
    pub poster_extracted: bool,
    /// Permanent web-playable transcode; generated once, never purged.
    pub proxy_path: Option<String>,

    pub hidden: bool,
    pub hidden_reason: Option<String>,
    pub is_live_photo: bool,
    pub file_size_bytes: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::Locid",
        to = "super::location::Column::Locid",
        on_delete = "SetNull"
    )]
    Location,
    #[sea_orm(
        belongs_to = "super::sub_location::Entity",
        from = "Column::Subid",
        to = "super::sub_location::Column::Subid",
        on_delete = "SetNull"
    )]
    SubLocation,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
