//! Fixity verification records

use super::media::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FixityStatus {
    Valid,
    Corrupted,
    Missing,
    Error,
}

/// One verification check. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixityRecord {
    pub check_id: Uuid,
    pub media_sha: String,
    pub media_type: MediaKind,
    pub file_path: String,
    pub checked_at: DateTime<Utc>,
    pub checked_by: String,
    pub expected_hash: String,
    pub actual_hash: Option<String>,
    pub status: FixityStatus,
    pub actual_size: Option<u64>,
    pub error_message: Option<String>,
}

/// What to verify in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum FixityScope {
    All,
    Location { locid: Uuid },
    RandomSample { n: usize },
    NotVerifiedSince { cutoff: DateTime<Utc> },
}

/// Aggregate counts for one verification run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixityReport {
    pub checked: usize,
    pub valid: usize,
    pub corrupted: usize,
    pub missing: usize,
    pub errors: usize,
    pub duration_ms: u64,
    pub corrupted_files: Vec<String>,
}
