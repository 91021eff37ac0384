//! Reference map operations

use crate::domain::reference_map::{MapFormat, ReferenceMap, ReferenceMapPoint};
use crate::matching::{self, LocationCandidate};
use crate::refmap::{parse_file, ParsedPoint};
use crate::shared::error::CoreResult;
use crate::Archive;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct MapPreview {
    pub format: MapFormat,
    pub point_count: usize,
    pub sample: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointMatch {
    pub point_id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub state: Option<String>,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupSummary {
    pub groups_merged: usize,
    pub points_deleted: usize,
}

impl Archive {
    /// Parse without persisting, for an import preview dialog.
    pub async fn preview_reference_map(&self, path: &Path) -> CoreResult<MapPreview> {
        let (format, points) = parse_file(path).await?;
        Ok(MapPreview {
            format,
            point_count: points.len(),
            sample: points.iter().take(10).map(|p| p.name.clone()).collect(),
        })
    }

    /// Parse and persist a reference map with all of its points.
    pub async fn import_reference_map(
        &self,
        path: &Path,
        actor: &str,
    ) -> CoreResult<ReferenceMap> {
        let (format, parsed) = parse_file(path).await?;
        let map_id = Uuid::new_v4();
        let map = ReferenceMap {
            map_id,
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed map".into()),
            source_file: path.to_string_lossy().into_owned(),
            format,
            point_count: parsed.len(),
            imported_by: actor.to_string(),
            imported_at: Utc::now(),
        };

        let points: Vec<ReferenceMapPoint> = parsed
            .into_iter()
            .map(|p| to_point(map_id, p))
            .collect();
        self.catalog.insert_reference_map(&map, &points).await?;
        info!(%map_id, points = points.len(), "reference map imported");
        Ok(map)
    }

    pub async fn list_reference_maps(&self) -> CoreResult<Vec<ReferenceMap>> {
        self.catalog.list_reference_maps().await
    }

    pub async fn get_reference_map(&self, map_id: Uuid) -> CoreResult<ReferenceMap> {
        self.catalog.get_reference_map(map_id).await
    }

    pub async fn all_reference_points(&self) -> CoreResult<Vec<ReferenceMapPoint>> {
        self.catalog.all_ref_points().await
    }

    pub async fn delete_reference_map(&self, map_id: Uuid) -> CoreResult<()> {
        self.catalog.delete_reference_map(map_id).await
    }

    pub async fn delete_reference_point(&self, point_id: Uuid) -> CoreResult<()> {
        self.catalog.delete_ref_point(point_id).await
    }

    /// Fuzzy search the reference layer by name.
    pub async fn find_reference_matches(
        &self,
        query: &str,
        threshold: f64,
        limit: usize,
        state: Option<&str>,
    ) -> CoreResult<Vec<PointMatch>> {
        let points = self.catalog.all_ref_points().await?;
        let mut matches: Vec<PointMatch> = points
            .into_iter()
            .filter(|p| match (state, &p.state) {
                (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|p| {
                let similarity = p
                    .aka_names
                    .iter()
                    .flat_map(|aka| aka.split('|'))
                    .chain(std::iter::once(p.name.as_str()))
                    .map(|n| matching::jaro_winkler(query, n))
                    .fold(0.0f64, f64::max);
                (similarity >= threshold).then_some(PointMatch {
                    point_id: p.point_id,
                    name: p.name,
                    lat: p.lat,
                    lng: p.lng,
                    state: p.state,
                    similarity,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Collapse points sharing a rounded GPS cell: best name survives,
    /// the others fold into `aka_names` and are deleted.
    pub async fn dedup_reference_points(&self) -> CoreResult<DedupSummary> {
        let points = self.catalog.all_ref_points().await?;
        let projected: Vec<(Uuid, String, (i64, i64), Option<String>)> = points
            .iter()
            .map(|p| (p.point_id, p.name.clone(), p.rounded_gps(), p.aka_names.clone()))
            .collect();

        let plans = matching::plan_point_dedup(&projected);
        let mut summary = DedupSummary::default();
        for plan in &plans {
            self.catalog
                .set_ref_point_aka(plan.keep, plan.merged_aka.as_deref())
                .await?;
            summary.points_deleted += self.catalog.delete_ref_points(&plan.delete).await? as usize;
            summary.groups_merged += 1;
        }
        info!(
            groups = summary.groups_merged,
            deleted = summary.points_deleted,
            "reference point dedup complete"
        );
        Ok(summary)
    }

    /// Reference points already represented by a catalogued location.
    pub async fn find_catalogued_points(&self) -> CoreResult<Vec<ReferenceMapPoint>> {
        let locations: Vec<LocationCandidate> = self.catalog.location_candidates().await?;
        let points = self.catalog.all_ref_points().await?;
        Ok(points
            .into_iter()
            .filter(|p| matching::is_catalogued(&p.name, (p.lat, p.lng), &locations))
            .collect())
    }

    /// Bulk-delete every already-catalogued point from the reference layer.
    pub async fn purge_catalogued_points(&self) -> CoreResult<usize> {
        let catalogued = self.find_catalogued_points().await?;
        let ids: Vec<Uuid> = catalogued.iter().map(|p| p.point_id).collect();
        let removed = self.catalog.delete_ref_points(&ids).await? as usize;
        info!(removed, "purged catalogued reference points");
        Ok(removed)
    }
}

fn to_point(map_id: Uuid, parsed: ParsedPoint) -> ReferenceMapPoint {
    let state = parsed
        .raw
        .as_ref()
        .and_then(|r| r.get("state"))
        .and_then(|s| s.as_str())
        .and_then(crate::domain::address::canonical_state);
    ReferenceMapPoint {
        point_id: Uuid::new_v4(),
        map_id,
        name: parsed.name,
        description: parsed.description,
        lat: parsed.lat,
        lng: parsed.lng,
        state,
        category: parsed.category,
        raw_metadata: parsed.raw,
        aka_names: None,
    }
}
