//! Worker pool over the durable queues
//!
//! Each queue gets its own set of workers under a configurable concurrency
//! cap. Workers poll, claim, heartbeat while running, and report success or
//! failure back to the queue. Cancellation is cooperative: dispatchers check
//! the run context at safe points.

use super::error::{JobError, JobResult};
use super::queue::{ClaimedJob, JobQueue};
use super::types::{JobId, QUEUE_METADATA, QUEUE_PROXY, QUEUE_THUMBNAIL};
use crate::infrastructure::events::{Event, EventBus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How often an idle worker polls its queue.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// How often a busy worker refreshes its claim heartbeat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// How often the maintenance task reclaims stalled jobs and purges old rows.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// Executes one claimed job. Implemented by the derivative/metadata layer.
#[async_trait]
pub trait JobDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, job: &ClaimedJob, ctx: &JobRunContext) -> JobResult<()>;
}

/// Handle a running job uses for progress and cancellation checks.
pub struct JobRunContext {
    job_id: JobId,
    queue: String,
    queues: JobQueue,
    events: Arc<EventBus>,
    shutdown: watch::Receiver<bool>,
}

impl JobRunContext {
    pub fn progress(&self, percent: f32, message: Option<String>) {
        self.events.emit(Event::JobProgress {
            queue: self.queue.clone(),
            job_id: self.job_id.0,
            percent: percent.clamp(0.0, 100.0),
            message,
        });
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Cooperative cancellation point. Returns `Err(Cancelled)` if the job
    /// was asked to stop or the pool is shutting down.
    pub async fn check_cancelled(&self) -> JobResult<()> {
        if *self.shutdown.borrow() {
            return Err(JobError::Cancelled);
        }
        if self.queues.is_cancel_requested(self.job_id).await? {
            return Err(JobError::Cancelled);
        }
        Ok(())
    }
}

/// Per-queue concurrency configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: HashMap<String, usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let mut concurrency = HashMap::new();
        concurrency.insert(QUEUE_THUMBNAIL.to_string(), cpus);
        concurrency.insert(QUEUE_METADATA.to_string(), cpus);
        // Transcoding saturates cores on its own; one at a time.
        concurrency.insert(QUEUE_PROXY.to_string(), 1);
        Self { concurrency }
    }
}

pub struct WorkerPool {
    queues: JobQueue,
    events: Arc<EventBus>,
    dispatcher: Arc<dyn JobDispatcher>,
    config: WorkerConfig,
    shutdown_tx: watch::Sender<bool>,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        queues: JobQueue,
        events: Arc<EventBus>,
        dispatcher: Arc<dyn JobDispatcher>,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            queues,
            events,
            dispatcher,
            config,
            shutdown_tx,
            handles: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawn workers for every configured queue plus the maintenance task.
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;
        for (queue, &count) in &self.config.concurrency {
            for slot in 0..count {
                let worker_id = format!("{queue}-{slot}");
                handles.push(tokio::spawn(worker_loop(
                    self.queues.clone(),
                    self.events.clone(),
                    self.dispatcher.clone(),
                    queue.clone(),
                    worker_id,
                    self.shutdown_tx.subscribe(),
                )));
            }
        }
        handles.push(tokio::spawn(maintenance_loop(
            self.queues.clone(),
            self.shutdown_tx.subscribe(),
        )));
        info!("Worker pool started");
    }

    /// Signal all workers and wait for them to drain.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("Worker pool stopped");
    }
}

async fn worker_loop(
    queues: JobQueue,
    events: Arc<EventBus>,
    dispatcher: Arc<dyn JobDispatcher>,
    queue: String,
    worker_id: String,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker_id, "worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let claimed = match queues.claim(&queue, &worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                // Idle: sleep until the next poll or shutdown.
                tokio::select! {
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    _ = shutdown.changed() => {}
                }
                continue;
            }
            Err(e) => {
                error!(worker_id, error = %e, "claim failed");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        let job_id = claimed.job_id;
        debug!(worker_id, %job_id, "claimed job");

        let ctx = JobRunContext {
            job_id,
            queue: queue.clone(),
            queues: queues.clone(),
            events: events.clone(),
            shutdown: shutdown.clone(),
        };

        let heartbeat = spawn_heartbeat(queues.clone(), job_id);
        let outcome = dispatcher.dispatch(&claimed, &ctx).await;
        heartbeat.abort();

        match outcome {
            Ok(()) => {
                if let Err(e) = queues.complete(job_id).await {
                    error!(%job_id, error = %e, "failed to mark job completed");
                }
            }
            Err(e) if e.is_cancellation() => {
                debug!(%job_id, "job abandoned cooperatively");
                // Shutdown requeues the work for next start; a user cancel
                // closes it out without dead-lettering.
                let requeue = *shutdown.borrow();
                if let Err(e) = queues.abandon(job_id, requeue).await {
                    error!(%job_id, error = %e, "failed to record cancellation");
                }
            }
            Err(e) => {
                if let Err(mark) = queues.fail(job_id, &e.to_string()).await {
                    error!(%job_id, error = %mark, "failed to record job failure");
                }
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

fn spawn_heartbeat(queues: JobQueue, job_id: JobId) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            if queues.heartbeat(job_id).await.is_err() {
                break;
            }
        }
    })
}

async fn maintenance_loop(queues: JobQueue, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(MAINTENANCE_INTERVAL) => {}
            _ = shutdown.changed() => {}
        }
        if *shutdown.borrow() {
            break;
        }
        if let Err(e) = queues.reclaim_stalled().await {
            error!(error = %e, "stall reclaim failed");
        }
        if let Err(e) = queues.purge_completed(None).await {
            error!(error = %e, "completed purge failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::MediaKind;
    use crate::infrastructure::database::Database;
    use crate::infrastructure::jobs::types::JobPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDispatcher {
        ran: AtomicUsize,
    }

    #[async_trait]
    impl JobDispatcher for CountingDispatcher {
        async fn dispatch(&self, _job: &ClaimedJob, ctx: &JobRunContext) -> JobResult<()> {
            ctx.check_cancelled().await?;
            self.ran.fetch_add(1, Ordering::SeqCst);
            ctx.progress(100.0, None);
            Ok(())
        }
    }

    #[tokio::test]
    async fn pool_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        let queues = JobQueue::new(Arc::new(db.conn().clone()));
        let events = Arc::new(EventBus::default());
        let dispatcher = Arc::new(CountingDispatcher {
            ran: AtomicUsize::new(0),
        });

        for _ in 0..3 {
            queues
                .enqueue(JobPayload::Thumbnail {
                    sha: "ab".repeat(32),
                    kind: MediaKind::Image,
                    archived_path: "/x".into(),
                })
                .await
                .unwrap();
        }

        let mut concurrency = HashMap::new();
        concurrency.insert(QUEUE_THUMBNAIL.to_string(), 2);
        let pool = WorkerPool::new(
            queues.clone(),
            events,
            dispatcher.clone(),
            WorkerConfig { concurrency },
        );
        pool.start().await;

        // Give the workers a few poll cycles.
        for _ in 0..40 {
            if dispatcher.ran.load(Ordering::SeqCst) == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        pool.shutdown().await;

        assert_eq!(dispatcher.ran.load(Ordering::SeqCst), 3);
    }
}
