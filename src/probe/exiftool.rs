//! exiftool invocation and EXIF normalization
//!
//! Invoked with `-j -n` for a flat JSON map with numeric GPS, and with
//! `-b -<Tag>` to capture embedded binary previews from stdout.

use super::PROBE_TIMEOUT;
use crate::domain::media::ImageMeta;
use crate::shared::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

pub struct ExifTool {
    binary: String,
    /// Serializes calls; the tool is a singleton resource.
    gate: Semaphore,
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifTool {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            gate: Semaphore::new(1),
        }
    }

    /// Run `exiftool -j -n` and return the flat tag map for the file.
    pub async fn probe_json(&self, path: &Path) -> CoreResult<serde_json::Value> {
        let _permit = self.gate.acquire().await.map_err(|_| {
            CoreError::internal("exiftool gate closed")
        })?;

        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.binary)
                .arg("-j")
                .arg("-n")
                .arg(path)
                .output(),
        )
        .await
        .map_err(|_| CoreError::external("exiftool", "timed out"))?
        .map_err(|e| CoreError::external("exiftool", e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::external(
                "exiftool",
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        // -j emits a one-element array per file.
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| CoreError::external("exiftool", format!("bad JSON output: {e}")))?;
        parsed
            .as_array()
            .and_then(|a| a.first())
            .cloned()
            .ok_or_else(|| CoreError::external("exiftool", "empty JSON output"))
    }

    /// Capture a binary tag (`PreviewImage`, `JpgFromRaw`, `ThumbnailImage`)
    /// as raw stdout bytes. Returns `None` when the tag is absent.
    pub async fn extract_binary_tag(&self, path: &Path, tag: &str) -> Option<Vec<u8>> {
        let _permit = self.gate.acquire().await.ok()?;

        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.binary)
                .arg("-b")
                .arg(format!("-{tag}"))
                .arg(path)
                .output(),
        )
        .await
        .ok()?
        .ok()?;

        if !output.status.success() || output.stdout.is_empty() {
            debug!(tag, path = %path.display(), "binary tag absent");
            return None;
        }
        Some(output.stdout)
    }
}

/// EXIF timestamps come as `YYYY:MM:DD HH:MM:SS`, sometimes with a
/// fractional-second or timezone suffix.
pub fn parse_exif_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    let head: String = trimmed.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn get_u32(raw: &serde_json::Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|k| raw.get(*k))
        .and_then(|v| v.as_u64())
        .map(|n| n as u32)
}

fn get_f64(raw: &serde_json::Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(|v| v.as_f64())
}

fn get_str(raw: &serde_json::Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Normalize an exiftool tag map into the typed image record. Everything
/// not promoted to a column stays reachable through `raw_exif_json`.
pub fn normalize_image(raw: &serde_json::Value) -> ImageMeta {
    ImageMeta {
        width: get_u32(raw, &["ImageWidth", "ExifImageWidth"]),
        height: get_u32(raw, &["ImageHeight", "ExifImageHeight"]),
        date_taken: get_str(raw, "DateTimeOriginal")
            .or_else(|| get_str(raw, "CreateDate"))
            .and_then(|s| parse_exif_datetime(&s)),
        camera_make: get_str(raw, "Make"),
        camera_model: get_str(raw, "Model"),
        gps_lat: get_f64(raw, "GPSLatitude"),
        gps_lng: get_f64(raw, "GPSLongitude"),
        orientation: get_u32(raw, &["Orientation"]),
        raw_exif_json: Some(raw.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_exif_datetime() {
        let dt = parse_exif_datetime("2021:10:03 14:22:01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-10-03T14:22:01+00:00");

        // Fractional seconds tolerated
        assert!(parse_exif_datetime("2021:10:03 14:22:01.55").is_some());
        assert!(parse_exif_datetime("garbage").is_none());
    }

    #[test]
    fn normalizes_image_tags() {
        let raw = json!({
            "ImageWidth": 6000,
            "ImageHeight": 4000,
            "Make": "NIKON CORPORATION",
            "Model": "NIKON D850",
            "DateTimeOriginal": "2021:10:03 14:22:01",
            "GPSLatitude": 40.6101,
            "GPSLongitude": -75.3702,
            "Orientation": 6,
        });
        let meta = normalize_image(&raw);
        assert_eq!(meta.width, Some(6000));
        assert_eq!(meta.camera_model.as_deref(), Some("NIKON D850"));
        assert_eq!(meta.gps_lat, Some(40.6101));
        assert_eq!(meta.orientation, Some(6));
        assert!(meta.raw_exif_json.is_some());
    }

    #[test]
    fn zero_gps_is_preserved() {
        // Null Island EXIF must stay Some(0.0), not collapse to None.
        let raw = json!({"GPSLatitude": 0.0, "GPSLongitude": 0.0});
        let meta = normalize_image(&raw);
        assert_eq!(meta.gps_lat, Some(0.0));
        assert_eq!(meta.gps_lng, Some(0.0));
    }
}
