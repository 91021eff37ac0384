//! Fixity service
//!
//! Re-hashes stored blobs on demand and on a light schedule, recording one
//! immutable `FixityRecord` per file checked. Detects bit rot (hash drift),
//! missing blobs, and I/O trouble; never mutates media rows.

use crate::catalog::media::MediaRecord;
use crate::catalog::Catalog;
use crate::content::hasher;
use crate::content::store::ContentStore;
use crate::domain::fixity::{FixityRecord, FixityReport, FixityScope, FixityStatus};
use crate::infrastructure::events::{Event, EventBus};
use crate::shared::error::CoreResult;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Sample size for the scheduled spot check.
const SCHEDULED_SAMPLE: usize = 100;
/// Sample size for the quick startup check.
const STARTUP_SAMPLE: usize = 25;

#[derive(Clone)]
pub struct FixityService {
    catalog: Catalog,
    store: ContentStore,
    events: Arc<EventBus>,
    last_result: Arc<RwLock<Option<FixityReport>>>,
}

impl FixityService {
    pub fn new(catalog: Catalog, store: ContentStore, events: Arc<EventBus>) -> Self {
        Self {
            catalog,
            store,
            events,
            last_result: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn last_result(&self) -> Option<FixityReport> {
        self.last_result.read().await.clone()
    }

    pub async fn verify_all(&self) -> CoreResult<FixityReport> {
        self.verify(FixityScope::All).await
    }

    pub async fn verify_location(&self, locid: Uuid) -> CoreResult<FixityReport> {
        self.verify(FixityScope::Location { locid }).await
    }

    pub async fn verify(&self, scope: FixityScope) -> CoreResult<FixityReport> {
        let started = Instant::now();
        let targets = self.targets_for(&scope).await?;
        info!(count = targets.len(), "fixity verification starting");

        let mut report = FixityReport::default();
        let checked_by = whoami::username();

        for media in &targets {
            let record = self.check_one(media, &checked_by).await;
            match record.status {
                FixityStatus::Valid => report.valid += 1,
                FixityStatus::Corrupted => {
                    report.corrupted += 1;
                    report.corrupted_files.push(media.archived_path.clone());
                }
                FixityStatus::Missing => report.missing += 1,
                FixityStatus::Error => report.errors += 1,
            }
            report.checked += 1;
            self.catalog.insert_fixity_record(&record).await?;
            // Yield between files; large scopes should not starve the runtime.
            tokio::task::yield_now().await;
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        if report.corrupted > 0 || report.missing > 0 {
            warn!(
                corrupted = report.corrupted,
                missing = report.missing,
                "fixity verification found problems"
            );
        } else {
            info!(checked = report.checked, "fixity verification clean");
        }

        self.events.emit(Event::FixityCompleted {
            checked: report.checked,
            corrupted: report.corrupted,
            missing: report.missing,
        });
        *self.last_result.write().await = Some(report.clone());
        Ok(report)
    }

    async fn targets_for(&self, scope: &FixityScope) -> CoreResult<Vec<MediaRecord>> {
        match scope {
            FixityScope::All => self.catalog.all_media().await,
            FixityScope::Location { locid } => self.catalog.media_by_location(*locid).await,
            FixityScope::RandomSample { n } => self.catalog.sample_media(*n).await,
            FixityScope::NotVerifiedSince { cutoff } => {
                let last_checked = self.catalog.last_checked_map().await?;
                let all = self.catalog.all_media().await?;
                Ok(all
                    .into_iter()
                    .filter(|m| {
                        last_checked
                            .get(&m.hash)
                            .map(|at| *at < *cutoff)
                            .unwrap_or(true)
                    })
                    .collect())
            }
        }
    }

    async fn check_one(&self, media: &MediaRecord, checked_by: &str) -> FixityRecord {
        let path = Path::new(&media.archived_path);
        let mut record = FixityRecord {
            check_id: Uuid::new_v4(),
            media_sha: media.hash.clone(),
            media_type: media.kind,
            file_path: media.archived_path.clone(),
            checked_at: Utc::now(),
            checked_by: checked_by.to_string(),
            expected_hash: media.hash.clone(),
            actual_hash: None,
            status: FixityStatus::Valid,
            actual_size: None,
            error_message: None,
        };

        if !self.store.exists(&media.hash).await && tokio::fs::metadata(path).await.is_err() {
            record.status = FixityStatus::Missing;
            record.error_message = Some(format!("blob absent at {}", media.archived_path));
            return record;
        }

        match hasher::hash_file(path).await {
            Ok(output) => {
                record.actual_hash = Some(output.sha256_hex.clone());
                record.actual_size = Some(output.bytes_read);
                if output.sha256_hex == media.hash {
                    record.status = FixityStatus::Valid;
                } else {
                    record.status = FixityStatus::Corrupted;
                    record.error_message = Some(format!(
                        "hash drift: expected {}.., found {}..",
                        &media.hash[..12.min(media.hash.len())],
                        &output.sha256_hex[..12]
                    ));
                }
            }
            Err(e) => {
                record.status = FixityStatus::Error;
                record.error_message = Some(e.to_string());
            }
        }
        record
    }
}

/// Interval scheduler: a spot check every `interval_days`, plus an optional
/// quick check right at startup.
pub fn spawn_scheduler(
    service: FixityService,
    interval_days: u32,
    check_on_startup: bool,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if check_on_startup {
            if let Err(e) = service
                .verify(FixityScope::RandomSample { n: STARTUP_SAMPLE })
                .await
            {
                warn!(error = %e, "startup fixity check failed");
            }
        }

        let period =
            std::time::Duration::from_secs(u64::from(interval_days.max(1)) * 24 * 60 * 60);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = service
                .verify(FixityScope::RandomSample { n: SCHEDULED_SAMPLE })
                .await
            {
                warn!(error = %e, "scheduled fixity check failed");
            }
        }
    })
}
