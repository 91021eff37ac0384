//! Location repository
//!
//! All writes validate, normalize the address, and re-derive region fields
//! when state, county or GPS changed. Deletion cascades sub-locations and
//! detaches media rows (the blobs and media rows are kept).

use super::Catalog;
use crate::domain::address;
use crate::domain::location::{
    Address, AddressConfidence, DocumentationFlags, Gps, GpsSource, Location,
};
use crate::domain::regions;
use crate::infrastructure::database::entities::{
    duplicate_exclusion, image, location, sub_location,
};
use crate::matching::{ExclusionPair, LocationCandidate};
use crate::shared::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use std::str::FromStr;
use uuid::Uuid;

/// Filters for `list`.
#[derive(Debug, Clone, Default)]
pub struct LocationFilters {
    pub state: Option<String>,
    pub loc_type: Option<String>,
    pub favorite: Option<bool>,
    pub project: Option<bool>,
    pub historic: Option<bool>,
    /// Case-insensitive substring over the display name.
    pub name_contains: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Catalog {
    pub async fn insert_location(&self, mut loc: Location) -> CoreResult<Location> {
        loc.validate()?;
        normalize_address(&mut loc.address);
        derive_regions(&mut loc);
        loc.locup = Utc::now();

        let model = to_active_model(&loc);
        model.insert(self.conn()).await.map_err(|e| match &e {
            sea_orm::DbErr::Exec(err) if err.to_string().contains("UNIQUE") => {
                CoreError::conflict(format!("location slug {} already exists", loc.loc12))
            }
            _ => CoreError::Database(e),
        })?;
        Ok(loc)
    }

    pub async fn update_location(&self, mut loc: Location) -> CoreResult<Location> {
        loc.validate()?;
        let existing = self.get_location(loc.locid).await?;

        normalize_address(&mut loc.address);
        let geometry_changed = existing.address.state != loc.address.state
            || existing.address.county != loc.address.county
            || existing.gps.as_ref().map(|g| (g.lat, g.lng))
                != loc.gps.as_ref().map(|g| (g.lat, g.lng));
        if geometry_changed {
            derive_regions(&mut loc);
        }
        loc.locup = Utc::now();

        let mut model = to_active_model(&loc);
        model.locid = sea_orm::ActiveValue::Unchanged(loc.locid);
        model.update(self.conn()).await?;
        Ok(loc)
    }

    pub async fn get_location(&self, locid: Uuid) -> CoreResult<Location> {
        let model = location::Entity::find_by_id(locid)
            .one(self.conn())
            .await?
            .ok_or_else(|| CoreError::not_found("location", locid))?;
        Ok(from_model(model))
    }

    pub async fn get_location_by_slug(&self, loc12: &str) -> CoreResult<Location> {
        let model = location::Entity::find()
            .filter(location::Column::Loc12.eq(loc12))
            .one(self.conn())
            .await?
            .ok_or_else(|| CoreError::not_found("location", loc12))?;
        Ok(from_model(model))
    }

    pub async fn list_locations(&self, filters: &LocationFilters) -> CoreResult<Vec<Location>> {
        let mut query = location::Entity::find().order_by_asc(location::Column::Locnam);
        if let Some(state) = &filters.state {
            query = query.filter(location::Column::AddressState.eq(state.to_ascii_uppercase()));
        }
        if let Some(loc_type) = &filters.loc_type {
            query = query.filter(location::Column::LocType.eq(loc_type));
        }
        if let Some(favorite) = filters.favorite {
            query = query.filter(location::Column::Favorite.eq(favorite));
        }
        if let Some(project) = filters.project {
            query = query.filter(location::Column::Project.eq(project));
        }
        if let Some(historic) = filters.historic {
            query = query.filter(location::Column::Historic.eq(historic));
        }
        if let Some(fragment) = &filters.name_contains {
            query = query.filter(location::Column::Locnam.contains(fragment));
        }
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        Ok(query
            .all(self.conn())
            .await?
            .into_iter()
            .map(from_model)
            .collect())
    }

    pub async fn count_locations(&self) -> CoreResult<u64> {
        Ok(location::Entity::find().count(self.conn()).await?)
    }

    pub async fn random_location(&self) -> CoreResult<Option<Location>> {
        let total = self.count_locations().await?;
        if total == 0 {
            return Ok(None);
        }
        let offset = rand::Rng::gen_range(&mut rand::thread_rng(), 0..total);
        let model = location::Entity::find()
            .offset(offset)
            .limit(1)
            .one(self.conn())
            .await?;
        Ok(model.map(from_model))
    }

    /// Locations within `radius_km` of a point, nearest first. The rough
    /// GPS index narrows the scan; exact distance runs in process.
    pub async fn find_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> CoreResult<Vec<(Location, f64)>> {
        let with_gps = location::Entity::find()
            .filter(location::Column::GpsLat.is_not_null())
            .all(self.conn())
            .await?;

        let radius_m = radius_km * 1000.0;
        let mut hits: Vec<(Location, f64)> = with_gps
            .into_iter()
            .filter_map(|model| {
                let (Some(plat), Some(plng)) = (model.gps_lat, model.gps_lng) else {
                    return None;
                };
                let d = crate::matching::haversine_m(lat, lng, plat, plng);
                (d <= radius_m).then(|| (from_model(model), d))
            })
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    pub async fn find_in_bounds(
        &self,
        bounds: crate::matching::BoundingBox,
    ) -> CoreResult<Vec<Location>> {
        let models = location::Entity::find()
            .filter(location::Column::GpsLat.is_not_null())
            .filter(location::Column::GpsLat.gte(bounds.min_lat))
            .filter(location::Column::GpsLat.lte(bounds.max_lat))
            .filter(location::Column::GpsLng.gte(bounds.min_lng))
            .filter(location::Column::GpsLng.lte(bounds.max_lng))
            .all(self.conn())
            .await?;
        Ok(models.into_iter().map(from_model).collect())
    }

    pub async fn set_favorite(&self, locid: Uuid, favorite: bool) -> CoreResult<()> {
        let updated = location::Entity::update_many()
            .col_expr(location::Column::Favorite, Expr::value(favorite))
            .col_expr(location::Column::Locup, Expr::value(Utc::now()))
            .filter(location::Column::Locid.eq(locid))
            .exec(self.conn())
            .await?;
        if updated.rows_affected == 0 {
            return Err(CoreError::not_found("location", locid));
        }
        Ok(())
    }

    pub async fn toggle_favorite(&self, locid: Uuid) -> CoreResult<bool> {
        let current = self.get_location(locid).await?;
        let next = !current.favorite;
        self.set_favorite(locid, next).await?;
        Ok(next)
    }

    /// Delete a location. Sub-locations cascade; media rows are detached by
    /// the FK rules, never deleted.
    pub async fn delete_location(&self, locid: Uuid) -> CoreResult<()> {
        let result = location::Entity::delete_by_id(locid)
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("location", locid));
        }
        Ok(())
    }

    /// Project all locations into matcher candidates.
    pub async fn location_candidates(&self) -> CoreResult<Vec<LocationCandidate>> {
        let models = location::Entity::find().all(self.conn()).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let mut names = vec![m.locnam.clone()];
                names.extend(m.akanam.clone());
                names.extend(m.historical_name.clone());
                LocationCandidate {
                    locid: m.locid,
                    names,
                    state: m.address_state.clone(),
                    gps: m.gps_lat.zip(m.gps_lng),
                }
            })
            .collect())
    }

    pub async fn duplicate_exclusions(&self) -> CoreResult<Vec<ExclusionPair>> {
        let rows = duplicate_exclusion::Entity::find().all(self.conn()).await?;
        Ok(rows
            .into_iter()
            .map(|r| ExclusionPair {
                name_a: r.name_a,
                name_b: r.name_b,
            })
            .collect())
    }

    pub async fn add_duplicate_exclusion(
        &self,
        a: &str,
        b: &str,
        actor: &str,
    ) -> CoreResult<()> {
        let pair = ExclusionPair::new(a, b);
        // Store lexicographically so the unique index catches both orders.
        let (first, second) = if pair.name_a <= pair.name_b {
            (pair.name_a, pair.name_b)
        } else {
            (pair.name_b, pair.name_a)
        };
        let result = duplicate_exclusion::ActiveModel {
            name_a: Set(first),
            name_b: Set(second),
            created_by: Set(actor.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await;
        match result {
            Ok(_) => Ok(()),
            // Re-recording the same decision is a no-op.
            Err(e) if e.to_string().contains("UNIQUE") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Distinct existing type values, for suggestion lists.
    pub async fn known_types(&self) -> CoreResult<Vec<String>> {
        let rows: Vec<Option<String>> = location::Entity::find()
            .select_only()
            .column(location::Column::LocType)
            .distinct()
            .into_tuple()
            .all(self.conn())
            .await?;
        let mut types: Vec<String> = rows.into_iter().flatten().collect();
        types.sort();
        Ok(types)
    }

    /// Clear the weak hero reference anywhere it points at a deleted image.
    pub async fn clear_hero_references(&self, imghash: &str) -> CoreResult<()> {
        let txn = self.conn().begin().await?;
        location::Entity::update_many()
            .col_expr(
                location::Column::HeroImgsha,
                Expr::value(sea_orm::Value::String(None)),
            )
            .filter(location::Column::HeroImgsha.eq(imghash))
            .exec(&txn)
            .await?;
        sub_location::Entity::update_many()
            .col_expr(
                sub_location::Column::HeroImgsha,
                Expr::value(sea_orm::Value::String(None)),
            )
            .filter(sub_location::Column::HeroImgsha.eq(imghash))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// Set a hero image, verifying the image row exists (weak reference, but
    /// never dangling at write time).
    pub async fn set_hero_image(&self, locid: Uuid, imghash: &str) -> CoreResult<()> {
        let exists = image::Entity::find_by_id(imghash.to_string())
            .one(self.conn())
            .await?
            .is_some();
        if !exists {
            return Err(CoreError::not_found("image", imghash));
        }
        let updated = location::Entity::update_many()
            .col_expr(location::Column::HeroImgsha, Expr::value(imghash))
            .col_expr(location::Column::Locup, Expr::value(Utc::now()))
            .filter(location::Column::Locid.eq(locid))
            .exec(self.conn())
            .await?;
        if updated.rows_affected == 0 {
            return Err(CoreError::not_found("location", locid));
        }
        Ok(())
    }
}

impl Catalog {
    /// Insert a sub-location. When flagged primary, any existing primary for
    /// the same parent is demoted in the same transaction, keeping the
    /// at-most-one-primary invariant.
    pub async fn insert_sub_location(
        &self,
        sub: crate::domain::SubLocation,
    ) -> CoreResult<crate::domain::SubLocation> {
        sub.validate()?;
        // Parent must exist.
        self.get_location(sub.locid).await?;

        let txn = self.conn().begin().await?;
        if sub.is_primary {
            sub_location::Entity::update_many()
                .col_expr(sub_location::Column::IsPrimary, Expr::value(false))
                .filter(sub_location::Column::Locid.eq(sub.locid))
                .exec(&txn)
                .await?;
        }
        let insert = sub_location::ActiveModel {
            subid: Set(sub.subid),
            sub12: Set(sub.sub12.clone()),
            locid: Set(sub.locid),
            subnam: Set(sub.subnam.clone()),
            ssubname: Set(sub.ssubname.clone()),
            sub_type: Set(sub.sub_type.clone()),
            status: Set(sub.status.clone()),
            hero_imgsha: Set(sub.hero_imgsha.clone()),
            is_primary: Set(sub.is_primary),
            created_at: Set(sub.created_at),
            updated_at: Set(sub.updated_at),
        }
        .insert(&txn)
        .await;
        match insert {
            Ok(_) => {}
            Err(e) if e.to_string().contains("UNIQUE") => {
                txn.rollback().await?;
                return Err(CoreError::conflict(format!(
                    "sub-location {:?} already exists under this location",
                    sub.subnam
                )));
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e.into());
            }
        }
        txn.commit().await?;
        Ok(sub)
    }

    pub async fn sub_locations_of(
        &self,
        locid: Uuid,
    ) -> CoreResult<Vec<crate::domain::SubLocation>> {
        let rows = sub_location::Entity::find()
            .filter(sub_location::Column::Locid.eq(locid))
            .order_by_asc(sub_location::Column::Subnam)
            .all(self.conn())
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| crate::domain::SubLocation {
                subid: m.subid,
                sub12: m.sub12,
                locid: m.locid,
                subnam: m.subnam,
                ssubname: m.ssubname,
                sub_type: m.sub_type,
                status: m.status,
                hero_imgsha: m.hero_imgsha,
                is_primary: m.is_primary,
                created_at: m.created_at,
                updated_at: m.updated_at,
            })
            .collect())
    }

    pub async fn delete_sub_location(&self, subid: Uuid) -> CoreResult<()> {
        let result = sub_location::Entity::delete_by_id(subid)
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("sub-location", subid));
        }
        Ok(())
    }
}

/// Normalize the raw address input into the normalized/parsed columns and
/// canonicalize the state code.
fn normalize_address(addr: &mut Address) {
    if let Some(state) = &addr.state {
        if let Some(code) = address::canonical_state(state) {
            addr.state = Some(code);
        }
    }
    if let Some(raw) = &addr.raw {
        addr.normalized = Some(address::normalize(raw));
        addr.parsed_json = Some(address::parse(raw));
        if addr.state.is_none() {
            if let Some(state) = addr
                .parsed_json
                .as_ref()
                .and_then(|p| p.get("state"))
                .and_then(|s| s.as_str())
            {
                addr.state = Some(state.to_string());
            }
        }
    }
}

/// Recompute derived region fields. `cultural_region` is only auto-filled
/// when the user has not set it themselves.
fn derive_regions(loc: &mut Location) {
    let state = loc.address.state.as_deref();
    loc.census_region = None;
    loc.census_division = None;
    loc.state_direction = None;
    if let Some(state) = state {
        if let Some((region, division)) = regions::census(state) {
            loc.census_region = Some(region.to_string());
            loc.census_division = Some(division.to_string());
        }
        loc.state_direction = regions::state_direction(state).map(str::to_string);
        if !loc.cultural_region_user_set {
            loc.cultural_region =
                regions::cultural_region(state, loc.address.county.as_deref())
                    .map(str::to_string);
        }
    }
}

fn to_active_model(loc: &Location) -> location::ActiveModel {
    location::ActiveModel {
        locid: Set(loc.locid),
        loc12: Set(loc.loc12.clone()),
        locnam: Set(loc.locnam.clone()),
        akanam: Set(loc.akanam.clone()),
        historical_name: Set(loc.historical_name.clone()),
        loc_type: Set(loc.loc_type.clone()),
        loc_stype: Set(loc.loc_stype.clone()),
        gps_lat: Set(loc.gps.as_ref().map(|g| g.lat)),
        gps_lng: Set(loc.gps.as_ref().map(|g| g.lng)),
        gps_accuracy_m: Set(loc.gps.as_ref().and_then(|g| g.accuracy_m)),
        gps_source: Set(loc.gps.as_ref().map(|g| g.source.to_string())),
        gps_verified_on_map: Set(loc.gps.as_ref().is_some_and(|g| g.verified_on_map)),
        gps_captured_at: Set(loc.gps.as_ref().and_then(|g| g.captured_at)),
        geocode_tier: Set(loc.gps.as_ref().and_then(|g| g.geocode_tier.clone())),
        geocode_query: Set(loc.gps.as_ref().and_then(|g| g.geocode_query.clone())),
        address_street: Set(loc.address.street.clone()),
        address_city: Set(loc.address.city.clone()),
        address_county: Set(loc.address.county.clone()),
        address_state: Set(loc.address.state.clone()),
        address_zipcode: Set(loc.address.zipcode.clone()),
        address_confidence: Set(loc.address.confidence.map(|c| c.to_string())),
        address_geocoded_at: Set(loc.address.geocoded_at),
        address_raw: Set(loc.address.raw.clone()),
        address_normalized: Set(loc.address.normalized.clone()),
        address_parsed_json: Set(loc.address.parsed_json.clone()),
        census_region: Set(loc.census_region.clone()),
        census_division: Set(loc.census_division.clone()),
        state_direction: Set(loc.state_direction.clone()),
        cultural_region: Set(loc.cultural_region.clone()),
        cultural_region_user_set: Set(loc.cultural_region_user_set),
        documentation: Set(loc.documentation.clone()),
        access: Set(loc.access.clone()),
        historic: Set(loc.historic),
        favorite: Set(loc.favorite),
        project: Set(loc.project),
        doc_interior: Set(loc.doc_flags.interior),
        doc_exterior: Set(loc.doc_flags.exterior),
        doc_drone: Set(loc.doc_flags.drone),
        doc_web_history: Set(loc.doc_flags.web_history),
        built_year: Set(loc.built_year),
        abandoned_year: Set(loc.abandoned_year),
        hero_imgsha: Set(loc.hero_imgsha.clone()),
        auth_imp: Set(loc.auth_imp.clone()),
        locadd: Set(loc.locadd),
        locup: Set(loc.locup),
    }
}

fn from_model(m: location::Model) -> Location {
    let gps = match (m.gps_lat, m.gps_lng) {
        (Some(lat), Some(lng)) => Some(Gps {
            lat,
            lng,
            accuracy_m: m.gps_accuracy_m,
            source: m
                .gps_source
                .as_deref()
                .and_then(|s| GpsSource::from_str(s).ok())
                .unwrap_or(GpsSource::Imported),
            verified_on_map: m.gps_verified_on_map,
            captured_at: m.gps_captured_at,
            geocode_tier: m.geocode_tier,
            geocode_query: m.geocode_query,
        }),
        _ => None,
    };

    Location {
        locid: m.locid,
        loc12: m.loc12,
        locnam: m.locnam,
        akanam: m.akanam,
        historical_name: m.historical_name,
        loc_type: m.loc_type,
        loc_stype: m.loc_stype,
        gps,
        address: Address {
            street: m.address_street,
            city: m.address_city,
            county: m.address_county,
            state: m.address_state,
            zipcode: m.address_zipcode,
            confidence: m
                .address_confidence
                .as_deref()
                .and_then(|s| AddressConfidence::from_str(s).ok()),
            geocoded_at: m.address_geocoded_at,
            raw: m.address_raw,
            normalized: m.address_normalized,
            parsed_json: m.address_parsed_json,
        },
        census_region: m.census_region,
        census_division: m.census_division,
        state_direction: m.state_direction,
        cultural_region: m.cultural_region,
        cultural_region_user_set: m.cultural_region_user_set,
        documentation: m.documentation,
        access: m.access,
        historic: m.historic,
        favorite: m.favorite,
        project: m.project,
        doc_flags: DocumentationFlags {
            interior: m.doc_interior,
            exterior: m.doc_exterior,
            drone: m.doc_drone,
            web_history: m.doc_web_history,
        },
        built_year: m.built_year,
        abandoned_year: m.abandoned_year,
        hero_imgsha: m.hero_imgsha,
        auth_imp: m.auth_imp,
        locadd: m.locadd,
        locup: m.locup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::Database;

    async fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        (dir, Catalog::new(std::sync::Arc::new(db.conn().clone())))
    }

    #[tokio::test]
    async fn insert_derives_regions_and_normalizes_address() {
        let (_dir, catalog) = catalog().await;
        let mut loc = Location::new("Huber Breaker", "tester");
        loc.address.state = Some("pennsylvania".into());
        loc.address.county = Some("Luzerne County".into());
        loc.address.raw = Some("101 S Main St, Ashley, PA".into());

        let saved = catalog.insert_location(loc).await.unwrap();
        assert_eq!(saved.address.state.as_deref(), Some("PA"));
        assert_eq!(saved.census_region.as_deref(), Some("Northeast"));
        assert_eq!(saved.census_division.as_deref(), Some("Middle Atlantic"));
        assert_eq!(saved.cultural_region.as_deref(), Some("Anthracite Coal Region"));
        assert_eq!(
            saved.address.normalized.as_deref(),
            Some("101 south main street ashley pa")
        );

        let fetched = catalog.get_location(saved.locid).await.unwrap();
        assert_eq!(fetched.locnam, "Huber Breaker");
        assert_eq!(fetched.cultural_region.as_deref(), Some("Anthracite Coal Region"));
    }

    #[tokio::test]
    async fn user_set_cultural_region_survives_update() {
        let (_dir, catalog) = catalog().await;
        let mut loc = Location::new("Mill", "tester");
        loc.address.state = Some("PA".into());
        loc.address.county = Some("Luzerne".into());
        loc.cultural_region = Some("Wyoming Valley".into());
        loc.cultural_region_user_set = true;

        let saved = catalog.insert_location(loc).await.unwrap();
        assert_eq!(saved.cultural_region.as_deref(), Some("Wyoming Valley"));

        let mut updated = saved.clone();
        updated.address.county = Some("Lackawanna".into());
        let updated = catalog.update_location(updated).await.unwrap();
        assert_eq!(updated.cultural_region.as_deref(), Some("Wyoming Valley"));
    }

    #[tokio::test]
    async fn null_island_location_roundtrips() {
        let (_dir, catalog) = catalog().await;
        let mut loc = Location::new("Null Island Lighthouse", "tester");
        loc.gps = Some(Gps::new(0.0, 0.0, GpsSource::UserMapClick));

        let saved = catalog.insert_location(loc).await.unwrap();
        let fetched = catalog.get_location(saved.locid).await.unwrap();
        let gps = fetched.gps.expect("gps must be preserved");
        assert_eq!(gps.lat, 0.0);
        assert_eq!(gps.lng, 0.0);
    }

    #[tokio::test]
    async fn filters_and_favorites() {
        let (_dir, catalog) = catalog().await;
        let mut a = Location::new("Alpha Asylum", "t");
        a.address.state = Some("NY".into());
        let a = catalog.insert_location(a).await.unwrap();
        let mut b = Location::new("Beta Brewery", "t");
        b.address.state = Some("PA".into());
        catalog.insert_location(b).await.unwrap();

        let ny = catalog
            .list_locations(&LocationFilters {
                state: Some("ny".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ny.len(), 1);
        assert_eq!(ny[0].locnam, "Alpha Asylum");

        assert!(catalog.toggle_favorite(a.locid).await.unwrap());
        let favs = catalog
            .list_locations(&LocationFilters {
                favorite: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(catalog.count_locations().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_nearby_orders_by_distance() {
        let (_dir, catalog) = catalog().await;
        for (name, lat) in [("Near", 40.001), ("Far", 40.02), ("VeryFar", 41.0)] {
            let mut loc = Location::new(name, "t");
            loc.gps = Some(Gps::new(lat, -75.0, GpsSource::ManualEntry));
            catalog.insert_location(loc).await.unwrap();
        }
        let hits = catalog.find_nearby(40.0, -75.0, 5.0).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.locnam, "Near");
        assert_eq!(hits[1].0.locnam, "Far");
    }

    #[tokio::test]
    async fn delete_cascades_sublocations() {
        let (_dir, catalog) = catalog().await;
        let loc = catalog
            .insert_location(Location::new("Campus", "t"))
            .await
            .unwrap();
        let sub = crate::domain::SubLocation::new(loc.locid, "Powerhouse");
        catalog.insert_sub_location(sub).await.unwrap();

        catalog.delete_location(loc.locid).await.unwrap();
        assert!(catalog.get_location(loc.locid).await.is_err());
        assert!(catalog
            .sub_locations_of(loc.locid)
            .await
            .unwrap()
            .is_empty());
    }
}
