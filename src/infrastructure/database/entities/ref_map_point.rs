//! Reference map point entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ref_map_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub point_id: Uuid,
    pub map_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub state: Option<String>,
    pub category: Option<String>,
    pub raw_metadata: Option<Json>,
    /// Pipe-separated alternates merged during dedup.
    pub aka_names: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reference_map::Entity",
        from = "Column::MapId",
        to = "super::reference_map::Column::MapId",
        on_delete = "Cascade"
    )]
    Map,
}

impl Related<super::reference_map::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Map.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
