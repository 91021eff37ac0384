//! Location entity
//!
//! GPS and address are flattened onto columns; the raw/normalized/parsed
//! address triplet is preserved alongside the normalized fields.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub locid: Uuid,
    #[sea_orm(unique)]
    pub loc12: String,
    pub locnam: String,
    pub akanam: Option<String>,
    pub historical_name: Option<String>,
    pub loc_type: Option<String>,
    pub loc_stype: Option<String>,

    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub gps_accuracy_m: Option<f64>,
    pub gps_source: Option<String>,
    pub gps_verified_on_map: bool,
    pub gps_captured_at: Option<DateTimeUtc>,
    pub geocode_tier: Option<String>,
    pub geocode_query: Option<String>,

    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_county: Option<String>,
    pub address_state: Option<String>,
    pub address_zipcode: Option<String>,
    pub address_confidence: Option<String>,
    pub address_geocoded_at: Option<DateTimeUtc>,
    pub address_raw: Option<String>,
    pub address_normalized: Option<String>,
    pub address_parsed_json: Option<Json>,

    pub census_region: Option<String>,
    pub census_division: Option<String>,
    pub state_direction: Option<String>,
    pub cultural_region: Option<String>,
    pub cultural_region_user_set: bool,

    pub documentation: Option<String>,
    pub access: Option<String>,
    pub historic: bool,
    pub favorite: bool,
    pub project: bool,
    pub doc_interior: bool,
    pub doc_exterior: bool,
    pub doc_drone: bool,
    pub doc_web_history: bool,
    pub built_year: Option<i32>,
    pub abandoned_year: Option<i32>,

    pub hero_imgsha: Option<String>,

    pub auth_imp: String,
    pub locadd: DateTimeUtc,
    pub locup: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sub_location::Entity")]
    SubLocations,
    #[sea_orm(has_many = "super::import::Entity")]
    Imports,
    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
}

impl Related<super::sub_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubLocations.def()
    }
}

impl Related<super::import::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Imports.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
