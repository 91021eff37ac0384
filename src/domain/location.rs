//! Location - a real-world site being documented
//!
//! The primary domain entity. Every media file in the archive is bound to at
//! most one location; sub-locations model individual buildings on a campus.

use crate::shared::error::{CoreError, CoreResult};
use crate::shared::types::short_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a location's GPS fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GpsSource {
    UserMapClick,
    PhotoExif,
    GeocodedAddress,
    ManualEntry,
    RefMapPoint,
    Imported,
}

/// A GPS fix with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: Option<f64>,
    pub source: GpsSource,
    /// True only when the user has confirmed the pin on a map.
    pub verified_on_map: bool,
    pub captured_at: Option<DateTime<Utc>>,
    pub geocode_tier: Option<String>,
    pub geocode_query: Option<String>,
}

impl Gps {
    pub fn new(lat: f64, lng: f64, source: GpsSource) -> Self {
        Self {
            lat,
            lng,
            accuracy_m: None,
            source,
            verified_on_map: false,
            captured_at: None,
            geocode_tier: None,
            geocode_query: None,
        }
    }

    /// Range check. `(0, 0)` is a legal coordinate and must be preserved.
    pub fn validate(&self) -> CoreResult<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoreError::validation(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoreError::validation(format!(
                "longitude {} outside [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressConfidence {
    High,
    Medium,
    Low,
}

/// A postal address. The raw input is preserved alongside the normalized and
/// parsed forms so geocoding can be re-run later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    /// Two-letter state code.
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub confidence: Option<AddressConfidence>,
    pub geocoded_at: Option<DateTime<Utc>>,
    pub raw: Option<String>,
    pub normalized: Option<String>,
    pub parsed_json: Option<serde_json::Value>,
}

impl Address {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(state) = &self.state {
            if state.len() != 2 {
                return Err(CoreError::validation(format!(
                    "state must be a 2-letter code, got {state:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Documentation flags for a site visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationFlags {
    pub interior: bool,
    pub exterior: bool,
    pub drone: bool,
    pub web_history: bool,
}

/// A real-world site under documentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique identifier
    pub locid: Uuid,

    /// 12-char slug derived from `locid`, used in archive paths
    pub loc12: String,

    /// Display name
    pub locnam: String,

    /// Alternate and historical names
    pub akanam: Option<String>,
    pub historical_name: Option<String>,

    /// Free-text classification, suggested from existing values
    pub loc_type: Option<String>,
    pub loc_stype: Option<String>,

    pub gps: Option<Gps>,
    pub address: Address,

    /// Region fields derived from `state` / `county` (see `regions`)
    pub census_region: Option<String>,
    pub census_division: Option<String>,
    pub state_direction: Option<String>,
    pub cultural_region: Option<String>,
    /// True when the user set `cultural_region` by hand; derivation then
    /// leaves it alone.
    pub cultural_region_user_set: bool,

    pub documentation: Option<String>,
    pub access: Option<String>,
    pub historic: bool,
    pub favorite: bool,
    pub project: bool,
    pub doc_flags: DocumentationFlags,
    pub built_year: Option<i32>,
    pub abandoned_year: Option<i32>,

    /// Weak reference into the images table
    pub hero_imgsha: Option<String>,

    pub auth_imp: String,
    pub locadd: DateTime<Utc>,
    pub locup: DateTime<Utc>,
}

impl Location {
    pub fn new(name: impl Into<String>, actor: impl Into<String>) -> Self {
        let locid = Uuid::new_v4();
        let now = Utc::now();
        Self {
            locid,
            loc12: short_id(locid),
            locnam: name.into(),
            akanam: None,
            historical_name: None,
            loc_type: None,
            loc_stype: None,
            gps: None,
            address: Address::default(),
            census_region: None,
            census_division: None,
            state_direction: None,
            cultural_region: None,
            cultural_region_user_set: false,
            documentation: None,
            access: None,
            historic: false,
            favorite: false,
            project: false,
            doc_flags: DocumentationFlags::default(),
            built_year: None,
            abandoned_year: None,
            hero_imgsha: None,
            auth_imp: actor.into(),
            locadd: now,
            locup: now,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.locnam.trim().is_empty() {
            return Err(CoreError::validation("location name must not be empty"));
        }
        if let Some(gps) = &self.gps {
            gps.validate()?;
        }
        self.address.validate()?;
        Ok(())
    }

    /// All names a fuzzy match may run against.
    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.locnam.as_str()),
            self.akanam.as_deref(),
            self.historical_name.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_location_has_slug() {
        let loc = Location::new("Bethlehem Steel", "tester");
        assert_eq!(loc.loc12.len(), 12);
        assert!(loc.validate().is_ok());
    }

    #[test]
    fn null_island_is_valid() {
        // (0, 0) must survive validation; null-checks, never truthiness.
        let gps = Gps::new(0.0, 0.0, GpsSource::UserMapClick);
        assert!(gps.validate().is_ok());
    }

    #[test]
    fn out_of_range_gps_rejected() {
        assert!(Gps::new(90.1, 0.0, GpsSource::ManualEntry).validate().is_err());
        assert!(Gps::new(0.0, -180.5, GpsSource::ManualEntry).validate().is_err());
    }

    #[test]
    fn state_must_be_two_letters() {
        let mut loc = Location::new("Mill", "tester");
        loc.address.state = Some("Pennsylvania".into());
        assert!(loc.validate().is_err());
        loc.address.state = Some("PA".into());
        assert!(loc.validate().is_ok());
    }
}
