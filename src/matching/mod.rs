//! Matching engine
//!
//! Geographic and fuzzy-name matching used by creation flows (duplicate
//! guard), reference-map dedup, catalogued-point purge and enrichment. The
//! functions here are pure over candidate slices; the ops layer feeds them
//! catalog rows.

pub mod geo;
pub mod text;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use geo::{haversine_m, BoundingBox};
pub use text::{jaro_winkler, looks_like_coordinates, name_quality, normalize_name};

/// Any existing location within this radius of a candidate is a GPS match.
pub const GPS_DUPLICATE_RADIUS_M: f64 = 150.0;
/// Name-only similarity floor for the user-facing duplicate warning.
pub const NAME_DUPLICATE_THRESHOLD: f64 = 0.50;
/// A name-only match must be in the same state or within this distance.
pub const NAME_DUPLICATE_MAX_DISTANCE_M: f64 = 500.0;
/// Similarity floor for bulk purge and enrichment flows.
pub const BULK_NAME_THRESHOLD: f64 = 0.85;

/// A location as seen by the matcher, projected from a catalog row.
#[derive(Debug, Clone)]
pub struct LocationCandidate {
    pub locid: Uuid,
    pub names: Vec<String>,
    pub state: Option<String>,
    pub gps: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchType {
    Gps,
    Name,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub locid: Uuid,
    pub matched_name: String,
    pub match_type: MatchType,
    pub distance_m: Option<f64>,
    pub similarity: Option<f64>,
}

/// An exclusion pair recorded after the user said "different place".
/// Comparison is on normalized names, in either order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPair {
    pub name_a: String,
    pub name_b: String,
}

impl ExclusionPair {
    pub fn new(a: &str, b: &str) -> Self {
        Self {
            name_a: normalize_name(a),
            name_b: normalize_name(b),
        }
    }

    fn suppresses(&self, new_name: &str, existing_name: &str) -> bool {
        let n = normalize_name(new_name);
        let e = normalize_name(existing_name);
        (self.name_a == n && self.name_b == e) || (self.name_a == e && self.name_b == n)
    }
}

/// Duplicate detection for creation flows.
///
/// GPS within 150 m always matches. Without GPS, a Jaro-Winkler hit >= 0.50
/// against any known name matches, but only when the candidate shares the
/// existing location's state or lies within 500 m, so a generic "Main St"
/// never matches across the country.
pub fn find_duplicate(
    name: &str,
    gps: Option<(f64, f64)>,
    state: Option<&str>,
    candidates: &[LocationCandidate],
    exclusions: &[ExclusionPair],
) -> Option<DuplicateMatch> {
    let mut best: Option<DuplicateMatch> = None;

    for candidate in candidates {
        if candidate
            .names
            .iter()
            .any(|n| exclusions.iter().any(|x| x.suppresses(name, n)))
        {
            continue;
        }

        if let (Some((lat, lng)), Some((clat, clng))) = (gps, candidate.gps) {
            let d = haversine_m(lat, lng, clat, clng);
            if d <= GPS_DUPLICATE_RADIUS_M {
                let closer = best
                    .as_ref()
                    .and_then(|b| b.distance_m)
                    .map_or(true, |prev| d < prev);
                if closer {
                    best = Some(DuplicateMatch {
                        locid: candidate.locid,
                        matched_name: candidate.names.first().cloned().unwrap_or_default(),
                        match_type: MatchType::Gps,
                        distance_m: Some(d),
                        similarity: None,
                    });
                }
                continue;
            }
        }

        if gps.is_some() {
            // GPS present but out of radius: not a duplicate of this one.
            continue;
        }

        // Name-only matching is constrained to the same state; without a
        // candidate GPS there is no distance to fall back on.
        let same_state = matches!(
            (state, &candidate.state),
            (Some(s), Some(cs)) if s.eq_ignore_ascii_case(cs)
        );
        if !same_state {
            continue;
        }

        for candidate_name in &candidate.names {
            let sim = jaro_winkler(name, candidate_name);
            if sim < NAME_DUPLICATE_THRESHOLD {
                continue;
            }
            let better = match &best {
                None => true,
                Some(b) => b.match_type == MatchType::Name && sim > b.similarity.unwrap_or(0.0),
            };
            if better {
                best = Some(DuplicateMatch {
                    locid: candidate.locid,
                    matched_name: candidate_name.clone(),
                    match_type: MatchType::Name,
                    distance_m: None,
                    similarity: Some(sim),
                });
            }
        }
    }

    best
}

/// Plan for one dedup group: the surviving point, the names folded into its
/// `aka_names`, and the points to delete.
#[derive(Debug, Clone)]
pub struct DedupGroup {
    pub keep: Uuid,
    pub merged_aka: Option<String>,
    pub delete: Vec<Uuid>,
}

/// Group points by rounded GPS and pick each group's best name.
///
/// Input tuples: `(point_id, name, rounded_gps, existing_aka)`.
pub fn plan_point_dedup(
    points: &[(Uuid, String, (i64, i64), Option<String>)],
) -> Vec<DedupGroup> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (idx, point) in points.iter().enumerate() {
        groups.entry(point.2).or_default().push(idx);
    }

    let mut plans = Vec::new();
    for indices in groups.values() {
        if indices.len() < 2 {
            continue;
        }

        let winner = *indices
            .iter()
            .max_by(|&&a, &&b| {
                name_quality(&points[a].1)
                    .partial_cmp(&name_quality(&points[b].1))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap();

        let mut aka: Vec<String> = Vec::new();
        if let Some(existing) = &points[winner].3 {
            aka.extend(existing.split('|').map(str::to_string));
        }
        let mut delete = Vec::new();
        for &idx in indices {
            if idx == winner {
                continue;
            }
            let name = points[idx].1.trim();
            let winner_name = points[winner].1.trim();
            if !name.is_empty()
                && name != winner_name
                && !looks_like_coordinates(name)
                && !aka.iter().any(|a| a == name)
            {
                aka.push(name.to_string());
            }
            if let Some(existing) = &points[idx].3 {
                for prior in existing.split('|') {
                    if !prior.is_empty() && prior != winner_name && !aka.iter().any(|a| a == prior) {
                        aka.push(prior.to_string());
                    }
                }
            }
            delete.push(points[idx].0);
        }

        plans.push(DedupGroup {
            keep: points[winner].0,
            merged_aka: if aka.is_empty() { None } else { Some(aka.join("|")) },
            delete,
        });
    }

    plans
}

/// Whether a reference point is already represented by a catalogued location:
/// within 150 m of one, or name similarity >= 0.85 against one within 500 m.
pub fn is_catalogued(
    point_name: &str,
    point_gps: (f64, f64),
    locations: &[LocationCandidate],
) -> bool {
    for location in locations {
        let Some((lat, lng)) = location.gps else {
            continue;
        };
        let d = haversine_m(point_gps.0, point_gps.1, lat, lng);
        if d <= GPS_DUPLICATE_RADIUS_M {
            return true;
        }
        if d <= NAME_DUPLICATE_MAX_DISTANCE_M
            && location
                .names
                .iter()
                .any(|n| jaro_winkler(point_name, n) >= BULK_NAME_THRESHOLD)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, state: Option<&str>, gps: Option<(f64, f64)>) -> LocationCandidate {
        LocationCandidate {
            locid: Uuid::new_v4(),
            names: vec![name.to_string()],
            state: state.map(str::to_string),
            gps,
        }
    }

    #[test]
    fn gps_within_150m_matches() {
        // ~50 m north
        let existing = candidate("Bethlehem Steel Works", Some("PA"), Some((40.6100, -75.3700)));
        let found = find_duplicate(
            "Bethlehem Steel",
            Some((40.61045, -75.3700)),
            Some("PA"),
            &[existing],
            &[],
        )
        .expect("should match");
        assert_eq!(found.match_type, MatchType::Gps);
        assert!(found.distance_m.unwrap() < 150.0);
    }

    #[test]
    fn name_match_requires_same_state() {
        let existing = candidate("Main Street Mill", Some("OH"), None);
        // Same-ish name, different state, no GPS: no match
        assert!(find_duplicate("Main Street Mill", None, Some("PA"), &[existing.clone()], &[]).is_none());
        // Same state: matches
        assert!(find_duplicate("Main Street Mill", None, Some("OH"), &[existing], &[]).is_some());
    }

    #[test]
    fn exclusion_suppresses_warning() {
        let existing = candidate("Bethlehem Steel Works", Some("PA"), Some((40.61, -75.37)));
        let exclusion = ExclusionPair::new("Bethlehem Steel", "Bethlehem Steel Works");
        let found = find_duplicate(
            "Bethlehem Steel",
            Some((40.61045, -75.37)),
            Some("PA"),
            &[existing],
            &[exclusion],
        );
        assert!(found.is_none());
    }

    #[test]
    fn dedup_picks_best_name_and_merges_aka() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let gps = (401234, -755678);
        let points = vec![
            (ids[0], "Smith Hospital".to_string(), gps, None),
            (ids[1], "Smith Hosp.".to_string(), gps, None),
            (ids[2], "hospital".to_string(), gps, None),
            (ids[3], "40.1234,-75.5678".to_string(), gps, None),
        ];
        let plans = plan_point_dedup(&points);
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.keep, ids[0]);
        assert_eq!(plan.merged_aka.as_deref(), Some("Smith Hosp.|hospital"));
        assert_eq!(plan.delete.len(), 3);
    }

    #[test]
    fn singleton_groups_left_alone() {
        let points = vec![(Uuid::new_v4(), "Lone Mill".to_string(), (1, 2), None)];
        assert!(plan_point_dedup(&points).is_empty());
    }

    #[test]
    fn catalogued_point_detection() {
        let locations = vec![candidate("Smith Hospital", Some("PA"), Some((40.1234, -75.5678)))];
        // Within 150 m
        assert!(is_catalogued("anything", (40.1235, -75.5678), &locations));
        // 300 m away with a near-identical name
        assert!(is_catalogued("Smith Hospital", (40.1261, -75.5678), &locations));
        // 300 m away with an unrelated name
        assert!(!is_catalogued("Jones Asylum", (40.1261, -75.5678), &locations));
    }
}
