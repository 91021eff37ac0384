//! Location operations

use crate::domain::location::{Gps, GpsSource, Location};
use crate::matching::{self, BoundingBox, DuplicateMatch};
use crate::shared::error::{CoreError, CoreResult};
use crate::Archive;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

pub use crate::catalog::locations::LocationFilters;

/// Result of the duplicate guard.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCheck {
    pub has_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#match: Option<DuplicateMatch>,
}

/// Outcome of a guarded create.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Location),
    /// Nothing was written; the caller decides "same place" or "different
    /// place".
    DuplicateFound(DuplicateMatch),
}

impl Archive {
    /// Duplicate guard for creation flows: GPS within 150 m, or (without
    /// GPS) a name-similarity hit within the same state. Exclusion pairs
    /// recorded by the user suppress their warning.
    pub async fn check_duplicate(
        &self,
        name: &str,
        gps: Option<(f64, f64)>,
        state: Option<&str>,
    ) -> CoreResult<DuplicateCheck> {
        let candidates = self.catalog.location_candidates().await?;
        let exclusions = self.catalog.duplicate_exclusions().await?;
        let found = matching::find_duplicate(name, gps, state, &candidates, &exclusions);
        Ok(DuplicateCheck {
            has_duplicate: found.is_some(),
            r#match: found,
        })
    }

    /// Create a location behind the duplicate guard. `force` skips the
    /// guard (the caller already confirmed "different place" or adopted an
    /// exclusion).
    pub async fn create_location(
        &self,
        location: Location,
        force: bool,
    ) -> CoreResult<CreateOutcome> {
        location.validate()?;
        if !force {
            let check = self
                .check_duplicate(
                    &location.locnam,
                    location.gps.as_ref().map(|g| (g.lat, g.lng)),
                    location.address.state.as_deref(),
                )
                .await?;
            if let Some(found) = check.r#match {
                return Ok(CreateOutcome::DuplicateFound(found));
            }
        }
        let created = self.catalog.insert_location(location).await?;
        info!(locid = %created.locid, name = %created.locnam, "location created");
        Ok(CreateOutcome::Created(created))
    }

    /// Create a location pre-filled from a reference-map point; the point is
    /// deleted once the location commits.
    pub async fn create_location_from_ref_point(
        &self,
        point_id: Uuid,
        actor: &str,
        force: bool,
    ) -> CoreResult<CreateOutcome> {
        let point = self.catalog.get_ref_point(point_id).await?;

        let mut location = Location::new(point.name.clone(), actor);
        location.akanam = point.aka_names.clone();
        location.loc_type = point.category.clone();
        location.address.state = point.state.clone();
        let mut gps = Gps::new(point.lat, point.lng, GpsSource::RefMapPoint);
        gps.verified_on_map = false;
        location.gps = Some(gps);

        let outcome = self.create_location(location, force).await?;
        if matches!(outcome, CreateOutcome::Created(_)) {
            self.catalog.delete_ref_point(point_id).await?;
        }
        Ok(outcome)
    }

    pub async fn update_location(&self, location: Location) -> CoreResult<Location> {
        self.catalog.update_location(location).await
    }

    pub async fn get_location(&self, locid: Uuid) -> CoreResult<Location> {
        self.catalog.get_location(locid).await
    }

    pub async fn list_locations(&self, filters: &LocationFilters) -> CoreResult<Vec<Location>> {
        self.catalog.list_locations(filters).await
    }

    pub async fn delete_location(&self, locid: Uuid) -> CoreResult<()> {
        self.catalog.delete_location(locid).await?;
        info!(%locid, "location deleted; media rows detached");
        Ok(())
    }

    pub async fn count_locations(&self) -> CoreResult<u64> {
        self.catalog.count_locations().await
    }

    pub async fn random_location(&self) -> CoreResult<Option<Location>> {
        self.catalog.random_location().await
    }

    pub async fn find_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> CoreResult<Vec<(Location, f64)>> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::validation("search center out of range"));
        }
        self.catalog.find_nearby(lat, lng, radius_km).await
    }

    pub async fn find_in_bounds(&self, bounds: BoundingBox) -> CoreResult<Vec<Location>> {
        self.catalog.find_in_bounds(bounds).await
    }

    pub async fn set_favorite(&self, locid: Uuid, favorite: bool) -> CoreResult<()> {
        self.catalog.set_favorite(locid, favorite).await
    }

    pub async fn toggle_favorite(&self, locid: Uuid) -> CoreResult<bool> {
        self.catalog.toggle_favorite(locid).await
    }

    /// Record a "different place" decision so the warning never recurs.
    pub async fn add_duplicate_exclusion(&self, a: &str, b: &str, actor: &str) -> CoreResult<()> {
        self.catalog.add_duplicate_exclusion(a, b, actor).await
    }

    /// Apply a reference point's GPS to a location that lacks one. Requires
    /// strong name agreement and a matching state; the source is recorded as
    /// `ref_map_point` and never `verified_on_map`.
    pub async fn apply_ref_point_enrichment(
        &self,
        locid: Uuid,
        point_id: Uuid,
    ) -> CoreResult<Location> {
        let mut location = self.catalog.get_location(locid).await?;
        if location.gps.is_some() {
            return Err(CoreError::conflict(
                "location already has GPS; refusing to overwrite",
            ));
        }
        let point = self.catalog.get_ref_point(point_id).await?;

        let same_state = match (&location.address.state, &point.state) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        let similarity = location
            .candidate_names()
            .map(|n| matching::jaro_winkler(n, &point.name))
            .fold(0.0f64, f64::max);
        if !same_state || similarity < matching::BULK_NAME_THRESHOLD {
            return Err(CoreError::validation(format!(
                "enrichment requires same state and name similarity >= {:.2} (got {:.2})",
                matching::BULK_NAME_THRESHOLD,
                similarity
            )));
        }

        location.gps = Some(Gps::new(point.lat, point.lng, GpsSource::RefMapPoint));
        let updated = self.catalog.update_location(location).await?;
        info!(%locid, %point_id, "location enriched from reference point");
        Ok(updated)
    }
}
