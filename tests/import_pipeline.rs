//! End-to-end import pipeline scenarios
//!
//! These drive the pipeline against a real temp archive and catalog. No
//! external tools are assumed: metadata probing downgrades to a warning
//! when exiftool is unavailable, which is exactly the production behavior
//! for unreadable files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use vestige_core::catalog::Catalog;
use vestige_core::content::hasher::hash_file;
use vestige_core::content::store::ContentStore;
use vestige_core::domain::import::{ImportOptions, ImportRequest, ImportState};
use vestige_core::domain::location::Location;
use vestige_core::domain::media::MediaKind;
use vestige_core::infrastructure::database::Database;
use vestige_core::infrastructure::events::EventBus;
use vestige_core::infrastructure::jobs::JobQueue;
use vestige_core::pipeline::ImportPipeline;
use vestige_core::probe::MetadataProbe;

struct Harness {
    _dir: tempfile::TempDir,
    archive_root: PathBuf,
    source_dir: PathBuf,
    catalog: Catalog,
    store: ContentStore,
    pipeline: ImportPipeline,
    locid: Uuid,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let archive_root = dir.path().join("archive");
    let source_dir = dir.path().join("source");
    tokio::fs::create_dir_all(&source_dir).await.unwrap();

    let db = Database::open_or_create(&archive_root.join(".catalog/archive.db"))
        .await
        .unwrap();
    db.migrate().await.unwrap();
    let conn = Arc::new(db.conn().clone());
    let catalog = Catalog::new(conn.clone());
    let store = ContentStore::new(&archive_root);
    let events = Arc::new(EventBus::default());
    let queues = JobQueue::new(conn);
    let pipeline = ImportPipeline::new(
        catalog.clone(),
        store.clone(),
        MetadataProbe::new(),
        queues,
        events,
    );

    let location = catalog
        .insert_location(Location::new("Test Mill", "tester"))
        .await
        .unwrap();

    Harness {
        _dir: dir,
        archive_root,
        source_dir,
        catalog,
        store,
        pipeline,
        locid: location.locid,
    }
}

async fn write_source(harness: &Harness, name: &str, content: &[u8]) -> PathBuf {
    let path = harness.source_dir.join(name);
    tokio::fs::write(&path, content).await.unwrap();
    path
}

fn request(harness: &Harness, paths: Vec<PathBuf>) -> ImportRequest {
    ImportRequest {
        source_paths: paths,
        locid: harness.locid,
        subid: None,
        options: ImportOptions {
            delete_originals: false,
            use_hardlinks: false,
            verify_checksums: true,
            actor: "tester".into(),
        },
        notes: None,
    }
}

async fn count_blobs(root: &Path) -> usize {
    let mut count = 0;
    let mut stack = vec![root.join("images")];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                count += 1;
            }
        }
    }
    count
}

#[tokio::test]
async fn batch_with_in_session_and_cross_session_duplicates() {
    let h = harness().await;

    // File 5's content is archived by an earlier session.
    let pre = write_source(&h, "pre.jpg", b"already archived content").await;
    let report = h.pipeline.start(request(&h, vec![pre])).await.unwrap();
    assert_eq!(report.imported, 1);

    // Files 1-3 unique, file 4 repeats file 2, file 5 repeats the archived
    // content.
    let f1 = write_source(&h, "a.jpg", b"unique one").await;
    let f2 = write_source(&h, "b.jpg", b"unique two").await;
    let f3 = write_source(&h, "c.jpg", b"unique three").await;
    let f4 = write_source(&h, "d.jpg", b"unique two").await;
    let f5 = write_source(&h, "e.jpg", b"already archived content").await;

    let report = h
        .pipeline
        .start(request(&h, vec![f1, f2, f3, f4, f5]))
        .await
        .unwrap();

    assert_eq!(report.imported, 3, "{report:?}");
    assert_eq!(report.duplicates, 2, "{report:?}");
    assert_eq!(report.errors, 0, "{report:?}");

    // One blob from the pre-import plus exactly three new ones.
    assert_eq!(count_blobs(&h.archive_root).await, 4);
}

#[tokio::test]
async fn import_is_idempotent() {
    let h = harness().await;
    let f1 = write_source(&h, "a.jpg", b"payload one").await;
    let f2 = write_source(&h, "b.jpg", b"payload two").await;

    let first = h
        .pipeline
        .start(request(&h, vec![f1.clone(), f2.clone()]))
        .await
        .unwrap();
    assert_eq!(first.imported, 2);
    let blobs_after_first = count_blobs(&h.archive_root).await;

    let second = h.pipeline.start(request(&h, vec![f1, f2])).await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.duplicates, 2);

    // Zero new blobs, zero new media rows, one new session row.
    assert_eq!(count_blobs(&h.archive_root).await, blobs_after_first);
    let media = h.catalog.media_by_location(h.locid).await.unwrap();
    assert_eq!(media.len(), 2);
    assert_ne!(first.import_id, second.import_id);
    assert!(h
        .catalog
        .get_import_session(second.import_id)
        .await
        .is_ok());
}

#[tokio::test]
async fn media_rows_carry_hash_identity() {
    let h = harness().await;
    let f1 = write_source(&h, "a.jpg", b"some image").await;
    let expected_sha = hash_file(&f1).await.unwrap().sha256_hex;

    h.pipeline.start(request(&h, vec![f1])).await.unwrap();

    let media = h.catalog.media_by_location(h.locid).await.unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].hash, expected_sha);
    assert_eq!(media[0].kind, MediaKind::Image);

    // Rehash-identity law over the archived blob.
    let archived = hash_file(Path::new(&media[0].archived_path))
        .await
        .unwrap()
        .sha256_hex;
    assert_eq!(archived, expected_sha);
}

#[tokio::test]
async fn resume_finishes_interrupted_session() {
    let h = harness().await;
    let files: Vec<PathBuf> = {
        let mut files = Vec::new();
        for i in 0..3 {
            files.push(write_source(&h, &format!("f{i}.jpg"), format!("content {i}").as_bytes()).await);
        }
        files
    };

    // Manufacture a session that died mid-copy: file 0 fully finalized,
    // file 1 placed but never rowed, file 2 still un-hashed.
    let import_id = Uuid::new_v4();
    let options = ImportOptions {
        actor: "tester".into(),
        ..Default::default()
    };
    h.catalog
        .create_import_session(import_id, h.locid, None, &options, None)
        .await
        .unwrap();
    for file in &files {
        let stem = file.file_stem().unwrap().to_string_lossy().to_string();
        h.catalog
            .insert_planned_file(
                import_id,
                &file.to_string_lossy(),
                &stem,
                MediaKind::Image,
                None,
            )
            .await
            .unwrap();
    }
    let planned = h.catalog.planned_files(import_id).await.unwrap();

    // File 0: the full path a healthy run would have taken.
    let sha0 = hash_file(&files[0]).await.unwrap();
    h.catalog
        .set_planned_file_hashed(planned[0].id, &sha0.sha256_hex, sha0.bytes_read as i64)
        .await
        .unwrap();
    let placed0 = h
        .store
        .place(&files[0], &sha0.sha256_hex, MediaKind::Image, "jpg", false)
        .await
        .unwrap();
    h.catalog
        .set_planned_file_placed(planned[0].id, &placed0.path.to_string_lossy())
        .await
        .unwrap();

    // File 1: placed, crash before the media row committed.
    let sha1 = hash_file(&files[1]).await.unwrap();
    h.catalog
        .set_planned_file_hashed(planned[1].id, &sha1.sha256_hex, sha1.bytes_read as i64)
        .await
        .unwrap();
    let placed1 = h
        .store
        .place(&files[1], &sha1.sha256_hex, MediaKind::Image, "jpg", false)
        .await
        .unwrap();
    h.catalog
        .set_planned_file_placed(planned[1].id, &placed1.path.to_string_lossy())
        .await
        .unwrap();

    // Crash state: session was copying.
    h.catalog
        .set_import_state(import_id, ImportState::Copying)
        .await
        .unwrap();

    // It shows up as resumable, and resume completes the remainder.
    let resumable = h.catalog.resumable_sessions().await.unwrap();
    assert!(resumable.iter().any(|s| s.import_id == import_id));

    let report = h.pipeline.resume(import_id).await.unwrap();
    assert_eq!(report.imported, 3, "{report:?}");
    assert_eq!(report.errors, 0);

    let media = h.catalog.media_by_location(h.locid).await.unwrap();
    assert_eq!(media.len(), 3);
    assert_eq!(count_blobs(&h.archive_root).await, 3);

    let session = h.catalog.get_import_session(import_id).await.unwrap();
    assert_eq!(session.status, ImportState::Completed.to_string());
}

#[tokio::test]
async fn corrupt_copy_is_fatal_for_file_not_session() {
    let h = harness().await;
    let good = write_source(&h, "good.jpg", b"good bytes").await;
    let missing = h.source_dir.join("never-existed.jpg");

    let report = h
        .pipeline
        .start(request(&h, vec![good, missing]))
        .await;
    // The missing path fails the scan step outright; a session over a
    // directory, by contrast, only sees files that exist.
    assert!(report.is_err());

    let good2 = write_source(&h, "good2.jpg", b"more good bytes").await;
    let report = h
        .pipeline
        .start(request(&h, vec![h.source_dir.join("good.jpg"), good2]))
        .await
        .unwrap();
    assert_eq!(report.imported, 2);
}

#[tokio::test]
async fn delete_originals_waits_for_commit() {
    let h = harness().await;
    let f1 = write_source(&h, "a.jpg", b"to be deleted").await;

    let mut req = request(&h, vec![f1.clone()]);
    req.options.delete_originals = true;
    let report = h.pipeline.start(req).await.unwrap();
    assert_eq!(report.imported, 1);

    // Row committed, original gone, blob present.
    assert!(!f1.exists());
    assert_eq!(h.catalog.media_by_location(h.locid).await.unwrap().len(), 1);
    assert_eq!(count_blobs(&h.archive_root).await, 1);
}
