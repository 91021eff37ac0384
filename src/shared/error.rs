//! Crate-wide error type
//!
//! Every public operation returns `CoreResult<T>`. The `ErrorKind` taxonomy
//! drives caller policy: validation and conflict errors are surfaced verbatim,
//! I/O errors are retried inside the owning component, integrity errors are
//! fatal for the affected file but never for the session.

use std::path::PathBuf;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Classification of an error, independent of which component raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Io,
    Integrity,
    External,
    Cancelled,
    Internal,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("integrity violation for {sha}: {detail}")]
    Integrity { sha: String, detail: String },

    #[error("external tool {tool} failed: {message}")]
    External { tool: &'static str, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn integrity(sha: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Integrity {
            sha: sha.into(),
            detail: detail.into(),
        }
    }

    pub fn external(tool: &'static str, message: impl Into<String>) -> Self {
        Self::External {
            tool,
            message: message.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Io { .. } => ErrorKind::Io,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::External { .. } => ErrorKind::External,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the owning component may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io | ErrorKind::External)
    }
}

impl From<std::io::Error> for CoreError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        assert_eq!(
            CoreError::validation("bad lat").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CoreError::not_found("location", "abc").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(CoreError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            CoreError::integrity("deadbeef", "size mismatch").kind(),
            ErrorKind::Integrity
        );
    }

    #[test]
    fn retryable_kinds() {
        assert!(CoreError::external("exiftool", "timed out").is_retryable());
        assert!(!CoreError::conflict("loc12 taken").is_retryable());
    }
}
