//! Video probing via the transcoder suite's probe tool

use super::PROBE_TIMEOUT;
use crate::domain::media::VideoMeta;
use crate::shared::error::{CoreError, CoreResult};
use std::path::Path;
use tokio::process::Command;
use tokio::sync::Semaphore;

pub struct VideoProbe {
    binary: String,
    gate: Semaphore,
}

impl Default for VideoProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl VideoProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            gate: Semaphore::new(1),
        }
    }

    pub async fn probe_json(&self, path: &Path) -> CoreResult<serde_json::Value> {
        let _permit = self.gate.acquire().await.map_err(|_| {
            CoreError::internal("ffprobe gate closed")
        })?;

        let output = tokio::time::timeout(
            PROBE_TIMEOUT,
            Command::new(&self.binary)
                .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
                .arg(path)
                .output(),
        )
        .await
        .map_err(|_| CoreError::external("ffprobe", "timed out"))?
        .map_err(|e| CoreError::external("ffprobe", e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::external(
                "ffprobe",
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CoreError::external("ffprobe", format!("bad JSON output: {e}")))
    }
}

/// Parse an ffprobe rational like `30000/1001` into a float.
fn parse_rational(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => raw.parse().ok(),
    }
}

/// Normalize ffprobe output: duration from the format block, dimensions,
/// codec and frame rate from the first video stream.
pub fn normalize_video(raw: &serde_json::Value) -> VideoMeta {
    let format = raw.get("format");
    let video_stream = raw
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))
        });

    let tags = format.and_then(|f| f.get("tags"));
    let date_taken = tags
        .and_then(|t| t.get("creation_time"))
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));

    // Quicktime GPS arrives as ISO 6709 "+40.6101-075.3702/"
    let (gps_lat, gps_lng) = tags
        .and_then(|t| t.get("location"))
        .and_then(|v| v.as_str())
        .and_then(parse_iso6709)
        .map_or((None, None), |(lat, lng)| (Some(lat), Some(lng)));

    VideoMeta {
        duration_s: format
            .and_then(|f| f.get("duration"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok()),
        width: video_stream
            .and_then(|s| s.get("width"))
            .and_then(|v| v.as_u64())
            .map(|n| n as u32),
        height: video_stream
            .and_then(|s| s.get("height"))
            .and_then(|v| v.as_u64())
            .map(|n| n as u32),
        codec: video_stream
            .and_then(|s| s.get("codec_name"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        fps: video_stream
            .and_then(|s| s.get("avg_frame_rate"))
            .and_then(|v| v.as_str())
            .and_then(parse_rational)
            .filter(|fps| *fps > 0.0),
        date_taken,
        gps_lat,
        gps_lng,
        raw_probe_json: Some(raw.clone()),
    }
}

fn parse_iso6709(raw: &str) -> Option<(f64, f64)> {
    let trimmed = raw.trim_end_matches('/');
    let split_at = trimmed
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)?;
    let lat: f64 = trimmed[..split_at].parse().ok()?;
    let lng: f64 = trimmed[split_at..].parse().ok()?;
    Some((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_probe_output() {
        let raw = json!({
            "format": {
                "duration": "12.480000",
                "tags": {
                    "creation_time": "2022-06-14T18:30:00.000000Z",
                    "location": "+40.6101-075.3702/"
                }
            },
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 3840, "height": 2160,
                 "avg_frame_rate": "30000/1001"}
            ]
        });
        let meta = normalize_video(&raw);
        assert_eq!(meta.duration_s, Some(12.48));
        assert_eq!(meta.width, Some(3840));
        assert_eq!(meta.codec.as_deref(), Some("h264"));
        assert!((meta.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(meta.gps_lat, Some(40.6101));
        assert_eq!(meta.gps_lng, Some(-75.3702));
        assert!(meta.date_taken.is_some());
    }

    #[test]
    fn rational_parsing() {
        assert_eq!(parse_rational("30/1"), Some(30.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("25"), Some(25.0));
    }
}
