//! Embedded preview extraction for RAW and HEIC files
//!
//! RAW formats carry a camera-rendered JPEG inside the file; extraction
//! priority is `PreviewImage` then `JpgFromRaw` then `ThumbnailImage`,
//! taking the largest result. HEIC goes through the platform converter
//! instead. Failure here never blocks an import.

use super::exiftool::ExifTool;
use crate::domain::media::{is_heic, PreviewQuality};
use std::path::Path;
use tracing::debug;

/// Extraction priority; largest result wins.
const PREVIEW_TAGS: &[&str] = &["PreviewImage", "JpgFromRaw", "ThumbnailImage"];

/// An embedded thumbnail under this size can only serve as a low-quality
/// preview.
const LOW_QUALITY_THRESHOLD: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ExtractedPreview {
    pub jpeg_bytes: Vec<u8>,
    pub quality: PreviewQuality,
}

/// Pull the best embedded JPEG out of a RAW/HEIC file.
pub async fn extract_embedded_preview(
    exiftool: &ExifTool,
    path: &Path,
) -> Option<ExtractedPreview> {
    if is_heic(path) {
        if let Some(bytes) = heic_to_jpeg(path).await {
            return Some(ExtractedPreview {
                jpeg_bytes: bytes,
                quality: PreviewQuality::Full,
            });
        }
        // Converter unavailable; fall through to embedded tags.
    }

    let mut best: Option<Vec<u8>> = None;
    for tag in PREVIEW_TAGS {
        if let Some(bytes) = exiftool.extract_binary_tag(path, tag).await {
            let better = best.as_ref().map_or(true, |b| bytes.len() > b.len());
            if better {
                best = Some(bytes);
            }
        }
    }

    let bytes = best?;
    let quality = if bytes.len() < LOW_QUALITY_THRESHOLD {
        PreviewQuality::Low
    } else {
        PreviewQuality::Embedded
    };
    debug!(path = %path.display(), size = bytes.len(), %quality, "extracted embedded preview");
    Some(ExtractedPreview {
        jpeg_bytes: bytes,
        quality,
    })
}

/// Platform HEIC-to-JPEG path. On macOS the system `sips` converter handles
/// it; elsewhere there is no guaranteed converter and we return `None`.
#[cfg(target_os = "macos")]
async fn heic_to_jpeg(path: &Path) -> Option<Vec<u8>> {
    let dir = tempfile::tempdir().ok()?;
    let out = dir.path().join("converted.jpg");
    let status = tokio::process::Command::new("sips")
        .args(["-s", "format", "jpeg"])
        .arg(path)
        .arg("--out")
        .arg(&out)
        .output()
        .await
        .ok()?;
    if !status.status.success() {
        return None;
    }
    tokio::fs::read(&out).await.ok()
}

#[cfg(not(target_os = "macos"))]
async fn heic_to_jpeg(_path: &Path) -> Option<Vec<u8>> {
    None
}
