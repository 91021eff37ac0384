//! Vestige Core
//!
//! Local-first media archival core for documenting physical sites: a
//! content-addressed blob store, a resumable staged import pipeline,
//! background derivative generation, scheduled fixity verification, and a
//! geo/name matching engine over an embedded SQLite catalog.

pub mod bagit;
pub mod catalog;
pub mod config;
pub mod content;
pub mod derivatives;
pub mod domain;
pub mod fixity;
pub mod geocode;
pub mod infrastructure;
pub mod manifest;
pub mod matching;
pub mod ops;
pub mod pipeline;
pub mod probe;
pub mod refmap;
pub mod shared;

use crate::bagit::BagService;
use crate::catalog::Catalog;
use crate::config::ArchiveConfig;
use crate::content::store::ContentStore;
use crate::derivatives::DerivativeGenerator;
use crate::fixity::FixityService;
use crate::geocode::{Geocoder, NoopGeocoder};
use crate::infrastructure::database::Database;
use crate::infrastructure::events::{Event, EventBus};
use crate::infrastructure::jobs::worker::WorkerConfig;
use crate::infrastructure::jobs::{JobQueue, WorkerPool};
use crate::pipeline::ImportPipeline;
use crate::probe::MetadataProbe;
use crate::shared::error::CoreResult;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// The root handle. Owns every component; everything else borrows from it.
/// One instance per archive; dropping it without `shutdown` leaves durable
/// state consistent but skips the graceful worker drain.
pub struct Archive {
    pub config: ArchiveConfig,
    db: Database,
    pub catalog: Catalog,
    pub store: ContentStore,
    pub probe: MetadataProbe,
    pub derivatives: DerivativeGenerator,
    pub queues: JobQueue,
    pub events: Arc<EventBus>,
    pub pipeline: ImportPipeline,
    pub fixity: FixityService,
    pub bags: BagService,
    pub geocoder: Arc<dyn Geocoder>,
    workers: WorkerPool,
    scheduler_shutdown: watch::Sender<bool>,
}

impl Archive {
    /// Initialize every component against the configured archive root.
    pub async fn open(config: ArchiveConfig) -> CoreResult<Self> {
        info!("Opening archive at {:?}", config.archive_path);

        // 1. Archive root and catalog
        tokio::fs::create_dir_all(&config.archive_path)
            .await
            .map_err(|e| shared::error::CoreError::io(&config.archive_path, e))?;
        let db = Database::open_or_create(&config.catalog_path()).await?;
        db.migrate().await?;
        let conn = Arc::new(db.conn().clone());
        let catalog = Catalog::new(conn.clone());

        // 2. Content store and external tools
        let store = ContentStore::new(&config.archive_path);
        let probe = MetadataProbe::new();
        let derivatives = DerivativeGenerator::new(store.clone());

        // 3. Events and job system
        let events = Arc::new(EventBus::default());
        let queues = JobQueue::new(conn);
        let dispatcher = Arc::new(ops::processing::ArchiveDispatcher::new(
            catalog.clone(),
            probe.clone(),
            derivatives.clone(),
            queues.clone(),
        ));
        let workers = WorkerPool::new(
            queues.clone(),
            events.clone(),
            dispatcher,
            WorkerConfig::default(),
        );
        workers.start().await;

        // 4. Pipeline and services
        let pipeline = ImportPipeline::new(
            catalog.clone(),
            store.clone(),
            probe.clone(),
            queues.clone(),
            events.clone(),
        );
        let fixity = FixityService::new(catalog.clone(), store.clone(), events.clone());
        let bags = BagService::new(catalog.clone(), store.clone());

        // 5. Fixity schedule
        let (scheduler_shutdown, scheduler_rx) = watch::channel(false);
        fixity::spawn_scheduler(
            fixity.clone(),
            config.fixity.interval_days,
            config.fixity.on_startup,
            scheduler_rx,
        );

        events.emit(Event::ArchiveStarted);
        info!("Archive ready");

        Ok(Self {
            config,
            db,
            catalog,
            store,
            probe,
            derivatives,
            queues,
            events,
            pipeline,
            fixity,
            bags,
            geocoder: Arc::new(NoopGeocoder),
            workers,
            scheduler_shutdown,
        })
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Back up the catalog file. Returns the backup path.
    pub async fn backup_catalog(&self) -> CoreResult<std::path::PathBuf> {
        Ok(self.db.backup().await?)
    }

    /// Graceful teardown on all exit paths: drain workers, stop the
    /// scheduler, emit the shutdown event.
    pub async fn shutdown(&self) -> CoreResult<()> {
        info!("Shutting down archive");
        let _ = self.scheduler_shutdown.send(true);
        self.workers.shutdown().await;
        self.events.emit(Event::ArchiveShutdown);
        info!("Archive shutdown complete");
        Ok(())
    }
}
