//! Staged import pipeline
//!
//! Five ordered steps per session: scan, hash, copy, validate, finalize.
//! Every step checkpoints per-file state in the catalog, so a crashed
//! session resumes exactly where it stopped: un-hashed files re-hash,
//! hashed-but-unplaced files place, placed-but-unrowed files finalize.
//! Idempotent placement and hash-keyed rows make each step safe to re-run.

pub mod scanner;

use crate::catalog::imports::PlannedFile;
use crate::catalog::media::NewMediaRow;
use crate::catalog::Catalog;
use crate::content::hasher;
use crate::content::store::ContentStore;
use crate::domain::import::{
    FileOutcome, FileResult, GpsMismatchSeverity, ImportOptions, ImportReport, ImportRequest,
    ImportState, ImportWarning, PlannedFileState,
};
use crate::domain::media::{MediaKind, MediaMeta};
use crate::infrastructure::events::{Event, EventBus};
use crate::infrastructure::jobs::{JobPayload, JobQueue};
use crate::manifest::{ManifestEntry, ManifestWriter};
use crate::matching::haversine_m;
use crate::probe::MetadataProbe;
use crate::shared::error::{CoreError, CoreResult, ErrorKind};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// EXIF-vs-location disagreement below this is noise.
const GPS_MISMATCH_MIN_M: f64 = 100.0;
/// Above this the mismatch is flagged major.
const GPS_MISMATCH_MAJOR_M: f64 = 500.0;

/// Transient I/O failures (network shares, sleepy drives) are retried this
/// many times before the error is surfaced for the file.
const IO_RETRY_ATTEMPTS: u32 = 3;
const IO_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(250);

#[derive(Clone)]
pub struct ImportPipeline {
    catalog: Catalog,
    store: ContentStore,
    probe: MetadataProbe,
    queues: JobQueue,
    events: Arc<EventBus>,
    manifests: ManifestWriter,
    cancel_flags: Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>,
}

impl ImportPipeline {
    pub fn new(
        catalog: Catalog,
        store: ContentStore,
        probe: MetadataProbe,
        queues: JobQueue,
        events: Arc<EventBus>,
    ) -> Self {
        let manifests = ManifestWriter::new(store.manifest_dir());
        Self {
            catalog,
            store,
            probe,
            queues,
            events,
            manifests,
            cancel_flags: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a fresh session: create the durable session row, scan, then run
    /// the remaining steps to completion.
    pub async fn start(&self, request: ImportRequest) -> CoreResult<ImportReport> {
        // Target must exist before anything touches disk.
        self.catalog.get_location(request.locid).await?;

        let import_id = Uuid::new_v4();
        self.catalog
            .create_import_session(
                import_id,
                request.locid,
                request.subid,
                &request.options,
                request.notes.clone(),
            )
            .await?;

        info!(%import_id, files = request.source_paths.len(), "import session started");

        self.catalog
            .set_import_state(import_id, ImportState::Scanning)
            .await?;
        let scanned = scanner::scan(&request.source_paths).await?;
        for file in &scanned {
            self.catalog
                .insert_planned_file(
                    import_id,
                    &file.path.to_string_lossy(),
                    &file.stem,
                    file.kind,
                    file.sidecar_of
                        .as_deref()
                        .map(|p| p.to_string_lossy())
                        .as_deref(),
                )
                .await?;
        }

        self.run(import_id, request.locid, request.subid, request.options)
            .await
    }

    /// Resume an interrupted session from its recorded per-file states.
    pub async fn resume(&self, import_id: Uuid) -> CoreResult<ImportReport> {
        let session = self.catalog.get_import_session(import_id).await?;
        let state: ImportState = session
            .status
            .parse()
            .map_err(|_| CoreError::internal(format!("bad session status {:?}", session.status)))?;
        if !state.is_resumable() {
            return Err(CoreError::conflict(format!(
                "session {import_id} is {state}, not resumable"
            )));
        }

        info!(%import_id, from = %state, "resuming import session");
        let options = ImportOptions {
            delete_originals: session.delete_originals,
            use_hardlinks: session.use_hardlinks,
            verify_checksums: session.verify_checksums,
            actor: session.auth_imp.clone(),
        };
        self.run(import_id, session.locid, session.subid, options)
            .await
    }

    /// Request cooperative cancellation of a running session.
    pub fn cancel(&self, import_id: Uuid) {
        if let Some(flag) = self.cancel_flags.lock().unwrap().get(&import_id) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    fn register_cancel_flag(&self, import_id: Uuid) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .lock()
            .unwrap()
            .insert(import_id, flag.clone());
        flag
    }

    fn drop_cancel_flag(&self, import_id: Uuid) {
        self.cancel_flags.lock().unwrap().remove(&import_id);
    }

    async fn run(
        &self,
        import_id: Uuid,
        locid: Uuid,
        subid: Option<Uuid>,
        options: ImportOptions,
    ) -> CoreResult<ImportReport> {
        let cancel = self.register_cancel_flag(import_id);
        let result = self
            .run_steps(import_id, locid, subid, &options, &cancel)
            .await;
        self.drop_cancel_flag(import_id);

        let report = result?;
        self.events.emit(Event::ImportCompleted {
            import_id,
            state: if report.cancelled {
                ImportState::Cancelled
            } else {
                ImportState::Completed
            },
        });
        Ok(report)
    }

    async fn run_steps(
        &self,
        import_id: Uuid,
        locid: Uuid,
        subid: Option<Uuid>,
        options: &ImportOptions,
        cancel: &AtomicBool,
    ) -> CoreResult<ImportReport> {
        let location_gps = self
            .catalog
            .get_location(locid)
            .await?
            .gps
            .map(|g| (g.lat, g.lng));

        // Step 2: hash everything still planned.
        self.catalog
            .set_import_state(import_id, ImportState::Hashing)
            .await?;
        if self
            .hash_step(import_id, cancel)
            .await?
            .cancelled(cancel)
        {
            return self.finish_cancelled(import_id).await;
        }

        // Step 3: place every hashed file.
        self.catalog
            .set_import_state(import_id, ImportState::Copying)
            .await?;
        if self
            .copy_step(import_id, options, cancel)
            .await?
            .cancelled(cancel)
        {
            return self.finish_cancelled(import_id).await;
        }

        // Steps 4 and 5: validate and finalize, one transaction per file.
        self.catalog
            .set_import_state(import_id, ImportState::Validating)
            .await?;
        self.catalog
            .set_import_state(import_id, ImportState::Finalizing)
            .await?;
        if self
            .finalize_step(import_id, locid, subid, options, location_gps, cancel)
            .await?
            .cancelled(cancel)
        {
            return self.finish_cancelled(import_id).await;
        }

        self.pair_live_photos(import_id).await?;

        self.catalog
            .set_import_state(import_id, ImportState::Completed)
            .await?;
        info!(%import_id, "import session completed");
        self.build_report(import_id, false).await
    }

    async fn finish_cancelled(&self, import_id: Uuid) -> CoreResult<ImportReport> {
        warn!(%import_id, "import session cancelled");
        self.catalog
            .set_import_state(import_id, ImportState::Cancelled)
            .await?;
        self.build_report(import_id, true).await
    }

    async fn hash_step(&self, import_id: Uuid, cancel: &AtomicBool) -> CoreResult<StepOutcome> {
        let files = self.catalog.planned_files(import_id).await?;

        // First-wins in-session dedup: hashes from files already past this
        // step count as seen, so resume keeps the original winner.
        let mut seen: HashSet<String> = files
            .iter()
            .filter(|f| {
                matches!(
                    f.state,
                    PlannedFileState::Hashed | PlannedFileState::Placed | PlannedFileState::Finalized
                )
            })
            .filter_map(|f| f.sha256.clone())
            .collect();

        let total_bytes: u64 = files.iter().filter_map(|f| f.file_size).map(|s| s as u64).sum();
        let mut bytes_done: u64 = 0;
        let total = files.len();

        for (index, file) in files.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StepOutcome::Stopped);
            }
            if file.state != PlannedFileState::Planned || !file.kind.is_archivable() {
                continue;
            }

            let path = Path::new(&file.source_path);
            let mut attempt = 0u32;
            let output = loop {
                match hasher::hash_file(path).await {
                    Err(e) if e.is_retryable() && attempt + 1 < IO_RETRY_ATTEMPTS => {
                        attempt += 1;
                        warn!(path = %path.display(), error = %e, attempt, "hash failed, retrying");
                        tokio::time::sleep(IO_RETRY_DELAY).await;
                    }
                    other => break other,
                }
            };
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    self.catalog
                        .set_planned_file_error(file.id, &e.to_string())
                        .await?;
                    self.catalog
                        .bump_import_counts(import_id, None, false, true)
                        .await?;
                    continue;
                }
            };
            bytes_done += output.bytes_read;

            let duplicate = seen.contains(&output.sha256_hex)
                || self
                    .catalog
                    .media_kind_of(&output.sha256_hex)
                    .await?
                    .is_some();

            self.catalog
                .set_planned_file_hashed(file.id, &output.sha256_hex, output.bytes_read as i64)
                .await?;

            if duplicate {
                self.catalog
                    .set_planned_file_state(file.id, PlannedFileState::Duplicate)
                    .await?;
                self.catalog
                    .bump_import_counts(import_id, None, true, false)
                    .await?;
                self.manifests
                    .append(
                        import_id,
                        &ManifestEntry {
                            source_path: file.source_path.clone(),
                            sha256: Some(output.sha256_hex.clone()),
                            target_path: None,
                            status: "duplicate".into(),
                            size_bytes: Some(output.bytes_read),
                            recorded_at: chrono::Utc::now(),
                        },
                    )
                    .await?;
            } else {
                seen.insert(output.sha256_hex);
            }

            self.events.emit(Event::ImportProgress {
                import_id,
                state: ImportState::Hashing,
                files_done: index + 1,
                files_total: total,
                bytes_done,
                bytes_total: total_bytes.max(bytes_done),
            });
        }
        Ok(StepOutcome::Ran)
    }

    async fn copy_step(
        &self,
        import_id: Uuid,
        options: &ImportOptions,
        cancel: &AtomicBool,
    ) -> CoreResult<StepOutcome> {
        let files = self.catalog.planned_files(import_id).await?;
        let total = files.len();

        for (index, file) in files.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StepOutcome::Stopped);
            }
            if file.state != PlannedFileState::Hashed {
                continue;
            }
            let Some(sha) = file.sha256.clone() else {
                self.catalog
                    .set_planned_file_error(file.id, "hashed file lost its hash")
                    .await?;
                continue;
            };

            let source = Path::new(&file.source_path);
            let ext = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin")
                .to_ascii_lowercase();

            let mut attempt = 0u32;
            let placed = loop {
                match self
                    .store
                    .place(source, &sha, file.kind, &ext, options.use_hardlinks)
                    .await
                {
                    Err(e) if e.is_retryable() && attempt + 1 < IO_RETRY_ATTEMPTS => {
                        attempt += 1;
                        warn!(path = %source.display(), error = %e, attempt, "placement failed, retrying");
                        tokio::time::sleep(IO_RETRY_DELAY).await;
                    }
                    other => break other,
                }
            };
            let placed = match placed {
                Ok(placed) => placed,
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "placement failed");
                    self.catalog
                        .set_planned_file_error(file.id, &e.to_string())
                        .await?;
                    self.catalog
                        .bump_import_counts(import_id, None, false, true)
                        .await?;
                    continue;
                }
            };

            if options.verify_checksums {
                let verify = hasher::hash_file(&placed.path).await?;
                hasher::check_size_consistency(&sha, placed.bytes, verify.bytes_read)?;
                if verify.sha256_hex != sha {
                    // Corrupt copy is fatal for this file, not the session.
                    let _ = self.store.delete(&sha).await;
                    let detail = format!(
                        "post-copy hash mismatch: expected {}.., got {}..",
                        &sha[..12],
                        &verify.sha256_hex[..12]
                    );
                    self.catalog
                        .set_planned_file_error(file.id, &detail)
                        .await?;
                    self.catalog
                        .bump_import_counts(import_id, None, false, true)
                        .await?;
                    continue;
                }
            }

            self.catalog
                .set_planned_file_placed(file.id, &placed.path.to_string_lossy())
                .await?;
            self.manifests
                .append(
                    import_id,
                    &ManifestEntry {
                        source_path: file.source_path.clone(),
                        sha256: Some(sha),
                        target_path: Some(placed.path.to_string_lossy().into_owned()),
                        status: "placed".into(),
                        size_bytes: Some(placed.bytes),
                        recorded_at: chrono::Utc::now(),
                    },
                )
                .await?;

            self.events.emit(Event::ImportProgress {
                import_id,
                state: ImportState::Copying,
                files_done: index + 1,
                files_total: total,
                bytes_done: placed.bytes,
                bytes_total: placed.bytes,
            });
        }
        Ok(StepOutcome::Ran)
    }

    async fn finalize_step(
        &self,
        import_id: Uuid,
        locid: Uuid,
        subid: Option<Uuid>,
        options: &ImportOptions,
        location_gps: Option<(f64, f64)>,
        cancel: &AtomicBool,
    ) -> CoreResult<StepOutcome> {
        let files = self.catalog.planned_files(import_id).await?;

        for file in &files {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StepOutcome::Stopped);
            }
            if file.state != PlannedFileState::Placed {
                continue;
            }
            let (Some(sha), Some(archived_path)) = (file.sha256.clone(), file.archived_path.clone())
            else {
                self.catalog
                    .set_planned_file_error(file.id, "placed file missing hash or path")
                    .await?;
                continue;
            };

            let mut warnings: Vec<ImportWarning> = Vec::new();
            let source = Path::new(&file.source_path);

            // Step 4: probe. External failures downgrade to a warning; the
            // file is archived either way.
            let meta = if matches!(
                file.kind,
                MediaKind::Image | MediaKind::Video | MediaKind::Document
            ) {
                match self.probe.probe(Path::new(&archived_path), file.kind).await {
                    Ok(meta) => Some(meta),
                    Err(e) if e.kind() == ErrorKind::External => {
                        warnings.push(ImportWarning::ProbeFailed {
                            message: e.to_string(),
                        });
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            // EXIF GPS versus the location pin. The location stays
            // authoritative; the EXIF fix is preserved on the row.
            if let Some(warning) =
                gps_mismatch_warning(location_gps, meta.as_ref().and_then(|m| m.gps()))
            {
                warnings.push(warning);
            }

            // Step 5: media row plus counts, then derivative jobs.
            if file.kind != MediaKind::Map {
                let (image_meta, video_meta, document_meta) = match meta {
                    Some(MediaMeta::Image(m)) => (Some(m), None, None),
                    Some(MediaMeta::Video(m)) => (None, Some(m), None),
                    Some(MediaMeta::Document(m)) => (None, None, Some(m)),
                    None => (None, None, None),
                };
                self.catalog
                    .insert_media_row(NewMediaRow {
                        sha: sha.clone(),
                        kind: file.kind,
                        original_name: source
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        original_path: file.source_path.clone(),
                        archived_path: archived_path.clone(),
                        locid,
                        subid,
                        import_id,
                        file_size_bytes: file.file_size.unwrap_or(0),
                        image_meta,
                        video_meta,
                        document_meta,
                    })
                    .await?;
            }
            self.catalog
                .bump_import_counts(import_id, Some(file.kind), false, false)
                .await?;

            match file.kind {
                MediaKind::Image => {
                    self.queues
                        .enqueue(JobPayload::Thumbnail {
                            sha: sha.clone(),
                            kind: MediaKind::Image,
                            archived_path: archived_path.clone(),
                        })
                        .await
                        .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
                }
                MediaKind::Video => {
                    self.queues
                        .enqueue(JobPayload::Poster {
                            sha: sha.clone(),
                            archived_path: archived_path.clone(),
                        })
                        .await
                        .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
                    self.queues
                        .enqueue(JobPayload::Proxy {
                            sha: sha.clone(),
                            archived_path: archived_path.clone(),
                        })
                        .await
                        .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
                }
                _ => {}
            }

            if !warnings.is_empty() {
                self.catalog
                    .set_planned_file_warnings(file.id, &serde_json::to_value(&warnings)?)
                    .await?;
            }

            self.catalog
                .set_planned_file_state(file.id, PlannedFileState::Finalized)
                .await?;
            self.manifests
                .append(
                    import_id,
                    &ManifestEntry {
                        source_path: file.source_path.clone(),
                        sha256: Some(sha),
                        target_path: Some(archived_path),
                        status: "imported".into(),
                        size_bytes: file.file_size.map(|s| s as u64),
                        recorded_at: chrono::Utc::now(),
                    },
                )
                .await?;

            // Only after the row is durable may the original go away.
            if options.delete_originals {
                if let Err(e) = tokio::fs::remove_file(source).await {
                    warn!(path = %source.display(), error = %e, "could not delete original");
                }
            }
        }
        Ok(StepOutcome::Ran)
    }

    /// Flag image/video pairs sharing a stem within this session.
    async fn pair_live_photos(&self, import_id: Uuid) -> CoreResult<()> {
        let files = self.catalog.planned_files(import_id).await?;
        let mut images: HashMap<&str, &PlannedFile> = HashMap::new();
        let mut videos: HashMap<&str, &PlannedFile> = HashMap::new();
        for file in &files {
            if file.state != PlannedFileState::Finalized {
                continue;
            }
            match file.kind {
                MediaKind::Image => {
                    images.insert(file.stem.as_str(), file);
                }
                MediaKind::Video => {
                    videos.insert(file.stem.as_str(), file);
                }
                _ => {}
            }
        }
        for (stem, image) in &images {
            if let Some(video) = videos.get(stem) {
                if let (Some(img_sha), Some(vid_sha)) = (&image.sha256, &video.sha256) {
                    self.catalog.mark_live_photo_pair(img_sha, vid_sha).await?;
                }
            }
        }
        Ok(())
    }

    /// Reconstruct the session report from durable per-file state.
    async fn build_report(&self, import_id: Uuid, cancelled: bool) -> CoreResult<ImportReport> {
        let files = self.catalog.planned_files(import_id).await?;
        let mut report = ImportReport {
            import_id,
            cancelled,
            ..Default::default()
        };
        for file in files {
            let outcome = match file.state {
                PlannedFileState::Finalized => FileOutcome::Imported,
                PlannedFileState::Duplicate => FileOutcome::Duplicate,
                PlannedFileState::SidecarOnly => FileOutcome::SidecarOnly,
                PlannedFileState::Error => FileOutcome::Error,
                _ => FileOutcome::Skipped,
            };
            let warnings = file
                .warnings_json
                .clone()
                .and_then(|w| serde_json::from_value(w).ok())
                .unwrap_or_default();
            report.record(FileResult {
                source_path: file.source_path.clone().into(),
                hash: file.sha256.clone(),
                kind: file.kind,
                outcome,
                warnings,
                error: file.error_message.clone(),
            });
        }
        Ok(report)
    }
}

enum StepOutcome {
    Ran,
    Stopped,
}

impl StepOutcome {
    fn cancelled(&self, flag: &AtomicBool) -> bool {
        matches!(self, StepOutcome::Stopped) || flag.load(Ordering::SeqCst)
    }
}

/// Non-blocking warning when a file's EXIF GPS disagrees with the location
/// pin by more than 100 m (`minor` up to 500 m, `major` beyond).
fn gps_mismatch_warning(
    location_gps: Option<(f64, f64)>,
    exif_gps: Option<(f64, f64)>,
) -> Option<ImportWarning> {
    let ((loc_lat, loc_lng), (exif_lat, exif_lng)) = (location_gps?, exif_gps?);
    let distance = haversine_m(loc_lat, loc_lng, exif_lat, exif_lng);
    if distance <= GPS_MISMATCH_MIN_M {
        return None;
    }
    let severity = if distance > GPS_MISMATCH_MAJOR_M {
        GpsMismatchSeverity::Major
    } else {
        GpsMismatchSeverity::Minor
    };
    Some(ImportWarning::GpsMismatch {
        distance_m: distance,
        severity,
        exif_lat,
        exif_lng,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_mismatch_severity_bands() {
        let location = Some((42.0, -76.0));

        // Identical and near coordinates stay quiet.
        assert!(gps_mismatch_warning(location, Some((42.0, -76.0))).is_none());
        assert!(gps_mismatch_warning(location, Some((42.0005, -76.0))).is_none());

        // ~330 m: minor.
        match gps_mismatch_warning(location, Some((42.003, -76.0))) {
            Some(ImportWarning::GpsMismatch { severity, .. }) => {
                assert_eq!(severity, GpsMismatchSeverity::Minor)
            }
            other => panic!("expected minor mismatch, got {other:?}"),
        }

        // ~1.1 km: major.
        match gps_mismatch_warning(location, Some((42.010, -76.0))) {
            Some(ImportWarning::GpsMismatch {
                severity,
                distance_m,
                ..
            }) => {
                assert_eq!(severity, GpsMismatchSeverity::Major);
                assert!(distance_m > 1_000.0);
            }
            other => panic!("expected major mismatch, got {other:?}"),
        }

        // Either side absent: no warning.
        assert!(gps_mismatch_warning(None, Some((42.0, -76.0))).is_none());
        assert!(gps_mismatch_warning(location, None).is_none());
    }
}
