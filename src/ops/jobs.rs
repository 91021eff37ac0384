//! Job queue operations

use crate::infrastructure::jobs::{DeadLetterEntry, JobId, QueueStatus};
use crate::shared::error::{CoreError, CoreResult};
use crate::Archive;
use uuid::Uuid;

impl Archive {
    pub async fn job_status(&self) -> CoreResult<Vec<QueueStatus>> {
        self.queues
            .status()
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }

    pub async fn dead_letters(&self, queue: Option<&str>) -> CoreResult<Vec<DeadLetterEntry>> {
        self.queues
            .dead_letters(queue)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }

    pub async fn retry_dead_letter(&self, dead_letter_id: Uuid) -> CoreResult<JobId> {
        self.queues
            .retry_dead_letter(dead_letter_id)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }

    pub async fn acknowledge_dead_letters(&self, ids: &[Uuid]) -> CoreResult<u64> {
        self.queues
            .acknowledge(ids)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }

    pub async fn clear_completed_jobs(&self, older_than_ms: Option<u64>) -> CoreResult<u64> {
        let older_than = older_than_ms.map(|ms| chrono::Duration::milliseconds(ms as i64));
        self.queues
            .purge_completed(older_than)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }

    pub async fn cancel_job(&self, job_id: JobId) -> CoreResult<()> {
        self.queues
            .request_cancel(job_id)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }
}
