//! SubLocation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sub_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub subid: Uuid,
    #[sea_orm(unique)]
    pub sub12: String,
    pub locid: Uuid,
    pub subnam: String,
    pub ssubname: Option<String>,
    pub sub_type: Option<String>,
    pub status: Option<String>,
    pub hero_imgsha: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::Locid",
        to = "super::location::Column::Locid",
        on_delete = "Cascade"
    )]
    Location,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
