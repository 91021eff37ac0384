//! Reference maps and their points
//!
//! A reference map is an imported KML/KMZ/GPX/GeoJSON/CSV file whose points
//! feed the cataloging workflow: each point is a candidate location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceMap {
    pub map_id: Uuid,
    pub name: String,
    pub source_file: String,
    pub format: MapFormat,
    pub point_count: usize,
    pub imported_by: String,
    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MapFormat {
    Kml,
    Kmz,
    Gpx,
    Geojson,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceMapPoint {
    pub point_id: Uuid,
    pub map_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub state: Option<String>,
    pub category: Option<String>,
    pub raw_metadata: Option<serde_json::Value>,
    /// Pipe-separated alternate names merged in during dedup.
    pub aka_names: Option<String>,
}

impl ReferenceMapPoint {
    pub fn new(map_id: Uuid, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            point_id: Uuid::new_v4(),
            map_id,
            name: name.into(),
            description: None,
            lat,
            lng,
            state: None,
            category: None,
            raw_metadata: None,
            aka_names: None,
        }
    }

    /// GPS rounded to 4 decimal places (~10 m), the dedup grouping key.
    pub fn rounded_gps(&self) -> (i64, i64) {
        (
            (self.lat * 10_000.0).round() as i64,
            (self.lng * 10_000.0).round() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounded_gps_groups_nearby_points() {
        let map_id = Uuid::new_v4();
        let a = ReferenceMapPoint::new(map_id, "A", 40.12341, -75.56779);
        let b = ReferenceMapPoint::new(map_id, "B", 40.12339, -75.56781);
        assert_eq!(a.rounded_gps(), b.rounded_gps());

        let far = ReferenceMapPoint::new(map_id, "C", 40.1300, -75.5678);
        assert_ne!(a.rounded_gps(), far.rounded_gps());
    }
}
