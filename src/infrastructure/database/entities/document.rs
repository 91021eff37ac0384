//! Document media entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dochash: String,
    pub original_name: String,
    pub original_path: String,
    pub archived_path: String,
    pub locid: Option<Uuid>,
    pub subid: Option<Uuid>,
    pub import_id: Option<Uuid>,
    pub docadd: DateTimeUtc,

    pub page_count: Option<i32>,
    pub author: Option<String>,
    pub title: Option<String>,

    pub hidden: bool,
    pub hidden_reason: Option<String>,
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
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
