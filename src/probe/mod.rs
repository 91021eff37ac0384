//! Metadata extraction via external tools
//!
//! The metadata tool and the video probe are opaque binaries invoked per
//! file with JSON output. Each handle is a process-wide singleton with
//! request queueing: calls are serialized through a semaphore so dozens of
//! concurrent pipeline files don't fork-bomb the system.

pub mod exiftool;
pub mod raw;
pub mod video;

use crate::domain::media::{DocumentMeta, MediaKind, MediaMeta};
use crate::shared::error::{CoreError, CoreResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Per-file budget for metadata extraction.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Facade over the external tools, normalizing their output into typed
/// records. Cheap to clone; the semaphores are shared.
#[derive(Clone)]
pub struct MetadataProbe {
    exiftool: Arc<exiftool::ExifTool>,
    video: Arc<video::VideoProbe>,
}

impl MetadataProbe {
    pub fn new() -> Self {
        Self {
            exiftool: Arc::new(exiftool::ExifTool::default()),
            video: Arc::new(video::VideoProbe::default()),
        }
    }

    pub fn with_binaries(exiftool_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            exiftool: Arc::new(exiftool::ExifTool::new(exiftool_bin)),
            video: Arc::new(video::VideoProbe::new(ffprobe_bin)),
        }
    }

    pub fn exiftool(&self) -> &exiftool::ExifTool {
        &self.exiftool
    }

    /// Probe one file, normalized per kind.
    pub async fn probe(&self, path: &Path, kind: MediaKind) -> CoreResult<MediaMeta> {
        match kind {
            MediaKind::Image => {
                let raw = self.exiftool.probe_json(path).await?;
                Ok(MediaMeta::Image(exiftool::normalize_image(&raw)))
            }
            MediaKind::Video => {
                let raw = self.video.probe_json(path).await?;
                Ok(MediaMeta::Video(video::normalize_video(&raw)))
            }
            MediaKind::Document => {
                let raw = self.exiftool.probe_json(path).await?;
                Ok(MediaMeta::Document(normalize_document(&raw)))
            }
            other => Err(CoreError::validation(format!(
                "kind {other} has no probe support"
            ))),
        }
    }

    /// Extract the best embedded JPEG preview from a RAW/HEIC file.
    /// Failure is non-fatal for imports; callers treat `None` accordingly.
    pub async fn extract_preview(&self, path: &Path) -> Option<raw::ExtractedPreview> {
        raw::extract_embedded_preview(&self.exiftool, path).await
    }
}

impl Default for MetadataProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_document(raw: &serde_json::Value) -> DocumentMeta {
    DocumentMeta {
        page_count: raw
            .get("PageCount")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32),
        author: raw
            .get("Author")
            .or_else(|| raw.get("Creator"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        title: raw.get("Title").and_then(|v| v.as_str()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_normalization() {
        let raw = json!({"PageCount": 12, "Author": "County Assessor", "Title": "Parcel Survey"});
        let meta = normalize_document(&raw);
        assert_eq!(meta.page_count, Some(12));
        assert_eq!(meta.author.as_deref(), Some("County Assessor"));
        assert_eq!(meta.title.as_deref(), Some("Parcel Survey"));
    }
}
