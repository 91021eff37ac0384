//! Recorded "different place" decisions
//!
//! A pair suppresses future duplicate warnings between the two names, in
//! either order. Names are stored normalized.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "duplicate_exclusions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name_a: String,
    pub name_b: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
