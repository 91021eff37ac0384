//! Durable background job system
//!
//! Per-queue FIFO with at-least-once delivery, persisted in the catalog so
//! pending work survives restarts. Workers claim jobs by atomic state
//! transition; failures retry with exponential backoff and land in the
//! dead-letter table once attempts are exhausted.

pub mod error;
pub mod queue;
pub mod types;
pub mod worker;

pub use error::{JobError, JobResult};
pub use queue::{ClaimedJob, DeadLetterEntry, JobQueue, QueueStatus};
pub use types::{JobId, JobPayload, JobState, QUEUE_METADATA, QUEUE_PROXY, QUEUE_THUMBNAIL};
pub use worker::{JobDispatcher, JobRunContext, WorkerPool};
