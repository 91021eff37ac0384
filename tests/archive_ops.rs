//! Archive-level operation scenarios: duplicate guard, reference-map
//! dedup, enrichment, and fixity bit-rot detection.

use std::path::PathBuf;
use vestige_core::config::ArchiveConfig;
use vestige_core::domain::fixity::FixityStatus;
use vestige_core::domain::import::{ImportOptions, ImportRequest};
use vestige_core::domain::location::{Gps, GpsSource, Location};
use vestige_core::matching::MatchType;
use vestige_core::ops::locations::CreateOutcome;
use vestige_core::Archive;

async fn open_archive() -> (tempfile::TempDir, Archive) {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiveConfig {
        archive_path: dir.path().join("archive"),
        ..Default::default()
    };
    let archive = Archive::open(config).await.unwrap();
    (dir, archive)
}

fn location_with_gps(name: &str, lat: f64, lng: f64, state: &str) -> Location {
    let mut location = Location::new(name, "tester");
    location.gps = Some(Gps::new(lat, lng, GpsSource::UserMapClick));
    location.address.state = Some(state.into());
    location
}

#[tokio::test]
async fn duplicate_guard_blocks_then_exclusion_allows() {
    let (_dir, archive) = open_archive().await;

    let existing = location_with_gps("Bethlehem Steel Works", 40.6100, -75.3700, "PA");
    let CreateOutcome::Created(_) = archive.create_location(existing, false).await.unwrap()
    else {
        panic!("first create must succeed");
    };

    // ~50 m north of the existing pin.
    let attempt = location_with_gps("Bethlehem Steel", 40.61045, -75.3700, "PA");
    match archive.create_location(attempt.clone(), false).await.unwrap() {
        CreateOutcome::DuplicateFound(found) => {
            assert_eq!(found.match_type, MatchType::Gps);
            let distance = found.distance_m.unwrap();
            assert!((30.0..150.0).contains(&distance), "distance {distance}");
        }
        CreateOutcome::Created(_) => panic!("guard should have fired"),
    }
    // Nothing was written.
    assert_eq!(archive.count_locations().await.unwrap(), 1);

    // The user says "different place"; the second attempt goes through.
    archive
        .add_duplicate_exclusion("Bethlehem Steel", "Bethlehem Steel Works", "tester")
        .await
        .unwrap();
    match archive.create_location(attempt, false).await.unwrap() {
        CreateOutcome::Created(loc) => assert_eq!(loc.locnam, "Bethlehem Steel"),
        CreateOutcome::DuplicateFound(_) => panic!("exclusion should suppress the guard"),
    }
    assert_eq!(archive.count_locations().await.unwrap(), 2);

    archive.shutdown().await.unwrap();
}

#[tokio::test]
async fn reference_map_dedup_keeps_best_name() {
    let (dir, archive) = open_archive().await;

    let csv_path = dir.path().join("points.csv");
    tokio::fs::write(
        &csv_path,
        "name,lat,lng\n\
         Smith Hospital,40.1234,-75.5678\n\
         Smith Hosp.,40.1234,-75.5678\n\
         hospital,40.1234,-75.5678\n\
         \"40.1234,-75.5678\",40.1234,-75.5678\n",
    )
    .await
    .unwrap();

    let map = archive
        .import_reference_map(&csv_path, "tester")
        .await
        .unwrap();
    assert_eq!(map.point_count, 4);

    let summary = archive.dedup_reference_points().await.unwrap();
    assert_eq!(summary.groups_merged, 1);
    assert_eq!(summary.points_deleted, 3);

    let points = archive.all_reference_points().await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].name, "Smith Hospital");
    assert_eq!(points[0].aka_names.as_deref(), Some("Smith Hosp.|hospital"));

    archive.shutdown().await.unwrap();
}

#[tokio::test]
async fn enrichment_applies_ref_gps_without_map_verification() {
    let (dir, archive) = open_archive().await;

    let mut location = Location::new("Smith Hospital", "tester");
    location.address.state = Some("PA".into());
    let CreateOutcome::Created(location) =
        archive.create_location(location, true).await.unwrap()
    else {
        panic!("create failed");
    };
    assert!(location.gps.is_none());

    let csv_path = dir.path().join("points.csv");
    tokio::fs::write(
        &csv_path,
        "name,lat,lng,state\nSmith Hospital,40.1234,-75.5678,PA\n",
    )
    .await
    .unwrap();
    archive
        .import_reference_map(&csv_path, "tester")
        .await
        .unwrap();
    let point = archive.all_reference_points().await.unwrap().remove(0);

    let enriched = archive
        .apply_ref_point_enrichment(location.locid, point.point_id)
        .await
        .unwrap();
    let gps = enriched.gps.expect("gps applied");
    assert_eq!(gps.lat, 40.1234);
    assert_eq!(gps.source, GpsSource::RefMapPoint);
    assert!(!gps.verified_on_map);

    archive.shutdown().await.unwrap();
}

#[tokio::test]
async fn fixity_detects_bit_rot() {
    let (dir, archive) = open_archive().await;

    let CreateOutcome::Created(location) = archive
        .create_location(Location::new("Rotting Mill", "tester"), true)
        .await
        .unwrap()
    else {
        panic!("create failed");
    };

    let source = dir.path().join("photo.jpg");
    tokio::fs::write(&source, b"original pristine bytes").await.unwrap();
    let report = archive
        .import(ImportRequest {
            source_paths: vec![source],
            locid: location.locid,
            subid: None,
            options: ImportOptions {
                actor: "tester".into(),
                ..Default::default()
            },
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(report.imported, 1);

    // Flip one byte of the stored blob.
    let media = archive.media_by_location(location.locid).await.unwrap();
    let blob_path = PathBuf::from(&media[0].archived_path);
    let mut bytes = tokio::fs::read(&blob_path).await.unwrap();
    bytes[0] ^= 0xFF;
    tokio::fs::write(&blob_path, &bytes).await.unwrap();

    let fixity = archive.fixity.verify_all().await.unwrap();
    assert_eq!(fixity.checked, 1);
    assert_eq!(fixity.corrupted, 1);
    assert_eq!(fixity.corrupted_files, vec![media[0].archived_path.clone()]);

    // The media row is untouched, and the record is in the history.
    let after = archive.media_by_location(location.locid).await.unwrap();
    assert_eq!(after.len(), 1);
    let history = archive.catalog.fixity_history(&media[0].hash).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, FixityStatus::Corrupted);

    archive.shutdown().await.unwrap();
}

#[tokio::test]
async fn dashboard_counts_track_entities() {
    let (_dir, archive) = open_archive().await;
    archive
        .create_location(Location::new("Lone Site", "tester"), true)
        .await
        .unwrap();

    let dashboard = archive.dashboard().await.unwrap();
    assert_eq!(dashboard.locations, 1);
    assert_eq!(dashboard.images, 0);
    assert_eq!(dashboard.dead_letters, 0);

    archive.shutdown().await.unwrap();
}
