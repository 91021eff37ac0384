//! Media kinds and probe metadata
//!
//! Three sibling media variants (image, video, document) share the hash-keyed
//! identity; kind-specific metadata is promoted to typed fields with a
//! `raw_exif_json` escape hatch for everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// Classification of a file encountered during scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
    Map,
    Sidecar,
    Skip,
}

impl MediaKind {
    /// Archive directory segment for primary blobs of this kind.
    pub fn dir_segment(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
            MediaKind::Document => "documents",
            MediaKind::Map => "maps",
            MediaKind::Sidecar => "sidecars",
            MediaKind::Skip => "skip",
        }
    }

    pub fn is_archivable(&self) -> bool {
        matches!(
            self,
            MediaKind::Image | MediaKind::Video | MediaKind::Document | MediaKind::Map
        )
    }
}

const IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif", "nef", "nrw",
    "cr2", "cr3", "arw", "dng", "orf", "raf", "rw2", "pef", "3fr", "iiq", "mrw", "x3f", "erf",
];

/// RAW and HEIC extensions that carry an embedded JPEG preview.
pub const RAW_EXTS: &[&str] = &[
    "nef", "nrw", "cr2", "cr3", "arw", "dng", "orf", "raf", "rw2", "pef", "3fr", "iiq", "mrw",
    "x3f", "erf", "heic", "heif",
];

const VIDEO_EXTS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "m4v", "mts", "m2ts", "wmv", "mpg", "mpeg", "webm", "3gp",
];

const DOCUMENT_EXTS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "odt"];

const MAP_EXTS: &[&str] = &["kml", "kmz", "gpx", "geojson", "csv"];

const SIDECAR_EXTS: &[&str] = &["xmp", "thm"];

/// Classify a path by extension.
pub fn classify(path: &Path) -> MediaKind {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return MediaKind::Skip,
    };
    let ext = ext.as_str();
    if IMAGE_EXTS.contains(&ext) {
        MediaKind::Image
    } else if VIDEO_EXTS.contains(&ext) {
        MediaKind::Video
    } else if DOCUMENT_EXTS.contains(&ext) {
        MediaKind::Document
    } else if MAP_EXTS.contains(&ext) {
        MediaKind::Map
    } else if SIDECAR_EXTS.contains(&ext) {
        MediaKind::Sidecar
    } else {
        MediaKind::Skip
    }
}

/// Whether the extension belongs to the RAW/HEIC preview-bearing set.
pub fn is_raw_or_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RAW_EXTS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_heic(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("heic" | "heif")
    )
}

/// How good a browser-viewable preview we managed to derive for a RAW/HEIC
/// original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PreviewQuality {
    /// Rendered from full image data
    Full,
    /// Extracted embedded preview at or near original resolution
    Embedded,
    /// Small embedded thumbnail only
    Low,
}

/// Normalized image metadata from the probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub date_taken: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub orientation: Option<u32>,
    pub raw_exif_json: Option<JsonValue>,
}

/// Normalized video metadata from the probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMeta {
    pub duration_s: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub fps: Option<f64>,
    pub date_taken: Option<DateTime<Utc>>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub raw_probe_json: Option<JsonValue>,
}

/// Normalized document metadata from the probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub page_count: Option<u32>,
    pub author: Option<String>,
    pub title: Option<String>,
}

/// Probe output for one file, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaMeta {
    Image(ImageMeta),
    Video(VideoMeta),
    Document(DocumentMeta),
}

impl MediaMeta {
    pub fn gps(&self) -> Option<(f64, f64)> {
        match self {
            MediaMeta::Image(m) => m.gps_lat.zip(m.gps_lng),
            MediaMeta::Video(m) => m.gps_lat.zip(m.gps_lng),
            MediaMeta::Document(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify(Path::new("a/b/photo.JPG")), MediaKind::Image);
        assert_eq!(classify(Path::new("clip.mov")), MediaKind::Video);
        assert_eq!(classify(Path::new("scan.pdf")), MediaKind::Document);
        assert_eq!(classify(Path::new("points.kmz")), MediaKind::Map);
        assert_eq!(classify(Path::new("photo.xmp")), MediaKind::Sidecar);
        assert_eq!(classify(Path::new("notes")), MediaKind::Skip);
        assert_eq!(classify(Path::new("weird.xyz")), MediaKind::Skip);
    }

    #[test]
    fn raw_detection() {
        assert!(is_raw_or_heic(&PathBuf::from("shot.NEF")));
        assert!(is_raw_or_heic(&PathBuf::from("shot.heic")));
        assert!(!is_raw_or_heic(&PathBuf::from("shot.jpg")));
        assert!(is_heic(&PathBuf::from("x.HEIF")));
        assert!(!is_heic(&PathBuf::from("x.dng")));
    }
}
