//! Durable queue operations over the jobs table

use super::error::{JobError, JobResult};
use super::types::{JobId, JobPayload, JobState};
use crate::infrastructure::database::entities::{dead_letter, job};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Retry backoff base.
const BACKOFF_BASE_SECS: f64 = 2.0;
/// Retry backoff cap.
const BACKOFF_CAP_SECS: f64 = 300.0;
/// Default attempts before dead-lettering.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;
/// Completed rows older than this are purged.
pub const COMPLETED_TTL_HOURS: i64 = 24;
/// A processing row with no heartbeat for this long is returned to pending.
pub const STALL_TIMEOUT_SECS: i64 = 600;

/// Full-jitter exponential backoff: uniform in `[0, min(cap, base * 2^n))`.
fn backoff_delay(attempts: i32) -> ChronoDuration {
    let ceiling = (BACKOFF_BASE_SECS * 2f64.powi(attempts.max(1) - 1)).min(BACKOFF_CAP_SECS);
    let jittered = rand::thread_rng().gen_range(0.0..=ceiling);
    ChronoDuration::milliseconds((jittered * 1000.0) as i64)
}

/// A job handed to a worker.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job_id: JobId,
    pub queue: String,
    pub payload: JobPayload,
    pub attempts: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub queue: String,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub original_job_id: Uuid,
    pub queue: String,
    pub payload: serde_json::Value,
    pub failed_at: DateTime<Utc>,
    pub error: String,
    pub acknowledged: bool,
}

impl From<dead_letter::Model> for DeadLetterEntry {
    fn from(m: dead_letter::Model) -> Self {
        Self {
            id: m.id,
            original_job_id: m.original_job_id,
            queue: m.queue,
            payload: m.payload,
            failed_at: m.failed_at,
            error: m.error,
            acknowledged: m.acknowledged,
        }
    }
}

/// Handle over the durable queues.
#[derive(Clone)]
pub struct JobQueue {
    conn: Arc<DatabaseConnection>,
}

impl JobQueue {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    pub async fn enqueue(&self, payload: JobPayload) -> JobResult<JobId> {
        let job_id = JobId::new();
        let now = Utc::now();
        job::ActiveModel {
            job_id: Set(job_id.0),
            queue: Set(payload.queue().to_string()),
            payload: Set(serde_json::to_value(&payload)?),
            state: Set(JobState::Pending.to_string()),
            attempts: Set(0),
            max_attempts: Set(DEFAULT_MAX_ATTEMPTS),
            next_attempt_at: Set(now),
            claimed_by: Set(None),
            claimed_at: Set(None),
            heartbeat_at: Set(None),
            cancel_requested: Set(false),
            last_error: Set(None),
            created_at: Set(now),
            completed_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await?;
        debug!(%job_id, queue = payload.queue(), "enqueued job");
        Ok(job_id)
    }

    /// Claim the oldest runnable job on a queue.
    ///
    /// The transition `pending -> processing` is optimistic: the UPDATE is
    /// filtered on the state still being pending, so two workers racing for
    /// the same row leave exactly one winner.
    pub async fn claim(&self, queue: &str, worker_id: &str) -> JobResult<Option<ClaimedJob>> {
        let now = Utc::now();
        loop {
            let candidate = job::Entity::find()
                .filter(job::Column::Queue.eq(queue))
                .filter(job::Column::State.eq(JobState::Pending.to_string()))
                .filter(job::Column::NextAttemptAt.lte(now))
                .order_by_asc(job::Column::CreatedAt)
                .limit(1)
                .one(self.conn.as_ref())
                .await?;

            let Some(candidate) = candidate else {
                return Ok(None);
            };

            let update = job::Entity::update_many()
                .col_expr(job::Column::State, Expr::value(JobState::Processing.to_string()))
                .col_expr(job::Column::ClaimedBy, Expr::value(worker_id))
                .col_expr(job::Column::ClaimedAt, Expr::value(now))
                .col_expr(job::Column::HeartbeatAt, Expr::value(now))
                .col_expr(job::Column::Attempts, Expr::value(candidate.attempts + 1))
                .filter(job::Column::JobId.eq(candidate.job_id))
                .filter(job::Column::State.eq(JobState::Pending.to_string()))
                .exec(self.conn.as_ref())
                .await?;

            if update.rows_affected == 0 {
                // Lost the race; try the next candidate.
                continue;
            }

            let payload: JobPayload = serde_json::from_value(candidate.payload.clone())?;
            return Ok(Some(ClaimedJob {
                job_id: JobId(candidate.job_id),
                queue: candidate.queue,
                payload,
                attempts: candidate.attempts + 1,
            }));
        }
    }

    pub async fn heartbeat(&self, job_id: JobId) -> JobResult<()> {
        job::Entity::update_many()
            .col_expr(job::Column::HeartbeatAt, Expr::value(Utc::now()))
            .filter(job::Column::JobId.eq(job_id.0))
            .exec(self.conn.as_ref())
            .await?;
        Ok(())
    }

    pub async fn complete(&self, job_id: JobId) -> JobResult<()> {
        job::Entity::update_many()
            .col_expr(job::Column::State, Expr::value(JobState::Completed.to_string()))
            .col_expr(job::Column::CompletedAt, Expr::value(Utc::now()))
            .filter(job::Column::JobId.eq(job_id.0))
            .exec(self.conn.as_ref())
            .await?;
        Ok(())
    }

    /// Record a failure: schedule a retry with backoff, or dead-letter once
    /// attempts are exhausted.
    pub async fn fail(&self, job_id: JobId, error: &str) -> JobResult<()> {
        let Some(row) = job::Entity::find_by_id(job_id.0).one(self.conn.as_ref()).await? else {
            return Err(JobError::NotFound(job_id));
        };

        if row.attempts < row.max_attempts {
            let delay = backoff_delay(row.attempts);
            let next = Utc::now() + delay;
            warn!(%job_id, attempts = row.attempts, retry_at = %next, error, "job failed, scheduling retry");
            job::Entity::update_many()
                .col_expr(job::Column::State, Expr::value(JobState::Pending.to_string()))
                .col_expr(job::Column::NextAttemptAt, Expr::value(next))
                .col_expr(job::Column::LastError, Expr::value(error))
                .col_expr(job::Column::ClaimedBy, Expr::value(sea_orm::Value::String(None)))
                .filter(job::Column::JobId.eq(job_id.0))
                .exec(self.conn.as_ref())
                .await?;
        } else {
            warn!(%job_id, error, "job exhausted retries, moving to dead letter");
            dead_letter::ActiveModel {
                id: Set(Uuid::new_v4()),
                original_job_id: Set(row.job_id),
                queue: Set(row.queue.clone()),
                payload: Set(row.payload.clone()),
                failed_at: Set(Utc::now()),
                error: Set(error.to_string()),
                acknowledged: Set(false),
            }
            .insert(self.conn.as_ref())
            .await?;
            job::Entity::update_many()
                .col_expr(job::Column::State, Expr::value(JobState::Failed.to_string()))
                .col_expr(job::Column::LastError, Expr::value(error))
                .col_expr(job::Column::CompletedAt, Expr::value(Utc::now()))
                .filter(job::Column::JobId.eq(job_id.0))
                .exec(self.conn.as_ref())
                .await?;
        }
        Ok(())
    }

    /// Release a job a worker gave up on without counting a failure.
    ///
    /// `requeue` returns it to pending (pool shutdown mid-run); otherwise it
    /// is closed out as failed-with-cancellation and never dead-lettered.
    pub async fn abandon(&self, job_id: JobId, requeue: bool) -> JobResult<()> {
        if requeue {
            job::Entity::update_many()
                .col_expr(job::Column::State, Expr::value(JobState::Pending.to_string()))
                .col_expr(job::Column::ClaimedBy, Expr::value(sea_orm::Value::String(None)))
                .col_expr(job::Column::NextAttemptAt, Expr::value(Utc::now()))
                .filter(job::Column::JobId.eq(job_id.0))
                .exec(self.conn.as_ref())
                .await?;
        } else {
            job::Entity::update_many()
                .col_expr(job::Column::State, Expr::value(JobState::Failed.to_string()))
                .col_expr(job::Column::LastError, Expr::value("cancelled"))
                .col_expr(job::Column::CompletedAt, Expr::value(Utc::now()))
                .filter(job::Column::JobId.eq(job_id.0))
                .exec(self.conn.as_ref())
                .await?;
        }
        Ok(())
    }

    pub async fn request_cancel(&self, job_id: JobId) -> JobResult<()> {
        job::Entity::update_many()
            .col_expr(job::Column::CancelRequested, Expr::value(true))
            .filter(job::Column::JobId.eq(job_id.0))
            .exec(self.conn.as_ref())
            .await?;
        Ok(())
    }

    pub async fn is_cancel_requested(&self, job_id: JobId) -> JobResult<bool> {
        let row = job::Entity::find_by_id(job_id.0)
            .one(self.conn.as_ref())
            .await?
            .ok_or(JobError::NotFound(job_id))?;
        Ok(row.cancel_requested)
    }

    /// Return stalled processing rows (no heartbeat within the timeout) to
    /// pending so another worker can pick them up.
    pub async fn reclaim_stalled(&self) -> JobResult<u64> {
        let cutoff = Utc::now() - ChronoDuration::seconds(STALL_TIMEOUT_SECS);
        let update = job::Entity::update_many()
            .col_expr(job::Column::State, Expr::value(JobState::Pending.to_string()))
            .col_expr(job::Column::ClaimedBy, Expr::value(sea_orm::Value::String(None)))
            .col_expr(job::Column::NextAttemptAt, Expr::value(Utc::now()))
            .filter(job::Column::State.eq(JobState::Processing.to_string()))
            .filter(job::Column::HeartbeatAt.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;
        if update.rows_affected > 0 {
            warn!(count = update.rows_affected, "reclaimed stalled jobs");
        }
        Ok(update.rows_affected)
    }

    /// Purge completed rows older than the TTL. Returns the count removed.
    pub async fn purge_completed(&self, older_than: Option<ChronoDuration>) -> JobResult<u64> {
        let cutoff = Utc::now() - older_than.unwrap_or_else(|| ChronoDuration::hours(COMPLETED_TTL_HOURS));
        let deleted = job::Entity::delete_many()
            .filter(job::Column::State.eq(JobState::Completed.to_string()))
            .filter(job::Column::CompletedAt.lt(cutoff))
            .exec(self.conn.as_ref())
            .await?;
        if deleted.rows_affected > 0 {
            info!(count = deleted.rows_affected, "purged completed jobs");
        }
        Ok(deleted.rows_affected)
    }

    pub async fn status(&self) -> JobResult<Vec<QueueStatus>> {
        let mut statuses = Vec::new();
        for queue in [
            super::types::QUEUE_THUMBNAIL,
            super::types::QUEUE_METADATA,
            super::types::QUEUE_PROXY,
        ] {
            let mut status = QueueStatus {
                queue: queue.to_string(),
                pending: 0,
                processing: 0,
                completed: 0,
                failed: 0,
            };
            for state in [
                JobState::Pending,
                JobState::Processing,
                JobState::Completed,
                JobState::Failed,
            ] {
                let count = job::Entity::find()
                    .filter(job::Column::Queue.eq(queue))
                    .filter(job::Column::State.eq(state.to_string()))
                    .count(self.conn.as_ref())
                    .await?;
                match state {
                    JobState::Pending => status.pending = count,
                    JobState::Processing => status.processing = count,
                    JobState::Completed => status.completed = count,
                    JobState::Failed => status.failed = count,
                }
            }
            statuses.push(status);
        }
        Ok(statuses)
    }

    pub async fn dead_letters(&self, queue: Option<&str>) -> JobResult<Vec<DeadLetterEntry>> {
        let mut query = dead_letter::Entity::find()
            .filter(dead_letter::Column::Acknowledged.eq(false))
            .order_by_desc(dead_letter::Column::FailedAt);
        if let Some(queue) = queue {
            query = query.filter(dead_letter::Column::Queue.eq(queue));
        }
        Ok(query
            .all(self.conn.as_ref())
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Re-enqueue a dead-lettered job with a fresh attempt budget.
    pub async fn retry_dead_letter(&self, dead_letter_id: Uuid) -> JobResult<JobId> {
        let entry = dead_letter::Entity::find_by_id(dead_letter_id)
            .one(self.conn.as_ref())
            .await?
            .ok_or(JobError::NotFound(JobId(dead_letter_id)))?;

        let payload: JobPayload = serde_json::from_value(entry.payload.clone())?;
        let job_id = self.enqueue(payload).await?;

        dead_letter::Entity::update_many()
            .col_expr(dead_letter::Column::Acknowledged, Expr::value(true))
            .filter(dead_letter::Column::Id.eq(dead_letter_id))
            .exec(self.conn.as_ref())
            .await?;

        Ok(job_id)
    }

    pub async fn acknowledge(&self, ids: &[Uuid]) -> JobResult<u64> {
        let update = dead_letter::Entity::update_many()
            .col_expr(dead_letter::Column::Acknowledged, Expr::value(true))
            .filter(dead_letter::Column::Id.is_in(ids.iter().copied()))
            .exec(self.conn.as_ref())
            .await?;
        Ok(update.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::MediaKind;
    use crate::infrastructure::database::Database;

    async fn queue() -> (tempfile::TempDir, JobQueue) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        let conn = Arc::new(db.conn().clone());
        (dir, JobQueue::new(conn))
    }

    fn thumb_payload() -> JobPayload {
        JobPayload::Thumbnail {
            sha: "ab".repeat(32),
            kind: MediaKind::Image,
            archived_path: "/archive/images/ab/x.jpg".into(),
        }
    }

    #[tokio::test]
    async fn enqueue_claim_complete() {
        let (_dir, queue) = queue().await;
        let job_id = queue.enqueue(thumb_payload()).await.unwrap();

        let claimed = queue
            .claim(super::super::types::QUEUE_THUMBNAIL, "worker-0")
            .await
            .unwrap()
            .expect("job should be claimable");
        assert_eq!(claimed.job_id, job_id);
        assert_eq!(claimed.attempts, 1);

        // Already claimed: nothing left
        assert!(queue
            .claim(super::super::types::QUEUE_THUMBNAIL, "worker-1")
            .await
            .unwrap()
            .is_none());

        queue.complete(job_id).await.unwrap();
        let status = queue.status().await.unwrap();
        let thumbs = status
            .iter()
            .find(|s| s.queue == super::super::types::QUEUE_THUMBNAIL)
            .unwrap();
        assert_eq!(thumbs.completed, 1);
    }

    #[tokio::test]
    async fn fifo_claim_order() {
        let (_dir, queue) = queue().await;
        let first = queue.enqueue(thumb_payload()).await.unwrap();
        let _second = queue.enqueue(thumb_payload()).await.unwrap();

        let claimed = queue
            .claim(super::super::types::QUEUE_THUMBNAIL, "w")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.job_id, first);
    }

    #[tokio::test]
    async fn failure_retries_then_dead_letters() {
        let (_dir, queue) = queue().await;
        let job_id = queue.enqueue(thumb_payload()).await.unwrap();

        for attempt in 1..=DEFAULT_MAX_ATTEMPTS {
            // Force the retry timer so the claim sees the job immediately.
            job::Entity::update_many()
                .col_expr(job::Column::NextAttemptAt, Expr::value(Utc::now()))
                .filter(job::Column::JobId.eq(job_id.0))
                .exec(queue.conn.as_ref())
                .await
                .unwrap();

            let claimed = queue
                .claim(super::super::types::QUEUE_THUMBNAIL, "w")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(claimed.attempts, attempt);
            queue.fail(job_id, "boom").await.unwrap();
        }

        let dead = queue.dead_letters(None).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].original_job_id, job_id.0);

        // Retry resurrects it as a fresh job and acknowledges the entry.
        let new_id = queue.retry_dead_letter(dead[0].id).await.unwrap();
        assert_ne!(new_id, job_id);
        assert!(queue.dead_letters(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_flag_roundtrip() {
        let (_dir, queue) = queue().await;
        let job_id = queue.enqueue(thumb_payload()).await.unwrap();
        assert!(!queue.is_cancel_requested(job_id).await.unwrap());
        queue.request_cancel(job_id).await.unwrap();
        assert!(queue.is_cancel_requested(job_id).await.unwrap());
    }

    #[test]
    fn backoff_respects_cap() {
        for attempts in 1..20 {
            let delay = backoff_delay(attempts);
            assert!(delay <= ChronoDuration::seconds(300));
            assert!(delay >= ChronoDuration::zero());
        }
    }
}
