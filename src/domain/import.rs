//! Import session domain types
//!
//! A session is a durable, resumable unit of ingestion. Session and per-file
//! states are persisted so a crashed import can pick up where it stopped.

use super::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Session lifecycle. Terminal states are `Completed`, `Cancelled`, `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImportState {
    Pending,
    Scanning,
    Hashing,
    Copying,
    Validating,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// States a crashed session may be resumed from.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::Scanning | Self::Hashing | Self::Copying | Self::Validating | Self::Finalizing
        )
    }
}

/// Per-file progress through the pipeline. Each step checkpoint advances the
/// state; resume re-drives a file from wherever it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlannedFileState {
    Planned,
    Hashed,
    Placed,
    Finalized,
    Duplicate,
    SidecarOnly,
    Skipped,
    Error,
}

impl PlannedFileState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finalized | Self::Duplicate | Self::SidecarOnly | Self::Skipped | Self::Error
        )
    }
}

/// Options supplied when starting an import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub delete_originals: bool,
    pub use_hardlinks: bool,
    pub verify_checksums: bool,
    pub actor: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delete_originals: false,
            use_hardlinks: false,
            verify_checksums: true,
            actor: whoami::username(),
        }
    }
}

/// Input to `media.import`.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source_paths: Vec<PathBuf>,
    pub locid: Uuid,
    pub subid: Option<Uuid>,
    pub options: ImportOptions,
    pub notes: Option<String>,
}

/// Outcome for a single file, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileOutcome {
    Imported,
    Duplicate,
    SidecarOnly,
    Skipped,
    Error,
}

/// A non-blocking warning attached to a file result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    /// EXIF GPS and location GPS disagree. The location is authoritative;
    /// the EXIF fix is preserved on the media row.
    GpsMismatch {
        distance_m: f64,
        severity: GpsMismatchSeverity,
        exif_lat: f64,
        exif_lng: f64,
    },
    /// Metadata extraction failed; the file was imported without derived data.
    ProbeFailed { message: String },
    /// No browser-viewable preview could be extracted from a RAW/HEIC file.
    PreviewUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GpsMismatchSeverity {
    Minor,
    Major,
}

/// Per-file result in the session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub source_path: PathBuf,
    pub hash: Option<String>,
    pub kind: MediaKind,
    pub outcome: FileOutcome,
    pub warnings: Vec<ImportWarning>,
    pub error: Option<String>,
}

/// Aggregate result of one import session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub import_id: Uuid,
    pub imported: usize,
    pub duplicates: usize,
    pub sidecars: usize,
    pub skipped: usize,
    pub errors: usize,
    pub files: Vec<FileResult>,
    pub cancelled: bool,
}

impl ImportReport {
    pub fn record(&mut self, result: FileResult) {
        match result.outcome {
            FileOutcome::Imported => self.imported += 1,
            FileOutcome::Duplicate => self.duplicates += 1,
            FileOutcome::SidecarOnly => self.sidecars += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Error => self.errors += 1,
        }
        self.files.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions() {
        assert!(ImportState::Completed.is_terminal());
        assert!(!ImportState::Copying.is_terminal());
        assert!(ImportState::Copying.is_resumable());
        assert!(!ImportState::Pending.is_resumable());
        assert!(!ImportState::Cancelled.is_resumable());
    }

    #[test]
    fn report_counts() {
        let mut report = ImportReport::default();
        report.record(FileResult {
            source_path: "a.jpg".into(),
            hash: Some("ab".repeat(32)),
            kind: MediaKind::Image,
            outcome: FileOutcome::Imported,
            warnings: vec![],
            error: None,
        });
        report.record(FileResult {
            source_path: "b.jpg".into(),
            hash: Some("ab".repeat(32)),
            kind: MediaKind::Image,
            outcome: FileOutcome::Duplicate,
            warnings: vec![],
            error: None,
        });
        assert_eq!(report.imported, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.files.len(), 2);
    }
}
