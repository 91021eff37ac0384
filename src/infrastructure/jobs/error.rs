//! Job system errors

use thiserror::Error;

pub type JobResult<T = ()> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("payload deserialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("job {0} not found")]
    NotFound(crate::infrastructure::jobs::JobId),

    #[error("job was cancelled")]
    Cancelled,

    #[error("job execution failed: {0}")]
    Execution(String),
}

impl JobError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Cancellation is an outcome, not a failure: it neither retries nor
    /// dead-letters.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<crate::shared::error::CoreError> for JobError {
    fn from(e: crate::shared::error::CoreError) -> Self {
        match e {
            crate::shared::error::CoreError::Cancelled => Self::Cancelled,
            other => Self::Execution(other.to_string()),
        }
    }
}
