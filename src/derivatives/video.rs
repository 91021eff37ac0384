//! Video poster extraction and proxy transcoding
//!
//! The transcoder is an opaque CLI. Poster: first keyframe after the first
//! second. Proxy: H.264 main profile, longest edge capped at 1920, CRF 23,
//! written to a temp path and renamed so a crashed transcode never leaves a
//! half-proxy visible.

use crate::shared::error::{CoreError, CoreResult};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

pub struct Transcoder {
    binary: String,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Grab the first keyframe after the one-second mark as a JPEG.
    pub async fn extract_poster(&self, source: &Path) -> CoreResult<Vec<u8>> {
        let dir = tempfile::tempdir().map_err(|e| CoreError::io("tempdir", e))?;
        let out = dir.path().join("poster.jpg");

        let output = Command::new(&self.binary)
            .args(["-ss", "1", "-skip_frame", "nokey"])
            .arg("-i")
            .arg(source)
            .args(["-frames:v", "1", "-q:v", "3", "-y"])
            .arg(&out)
            .output()
            .await
            .map_err(|e| CoreError::external("ffmpeg", e.to_string()))?;

        if !output.status.success() || !out.exists() {
            // Clips shorter than a second have no keyframe past it; retry
            // from the start.
            let output = Command::new(&self.binary)
                .arg("-i")
                .arg(source)
                .args(["-frames:v", "1", "-q:v", "3", "-y"])
                .arg(&out)
                .output()
                .await
                .map_err(|e| CoreError::external("ffmpeg", e.to_string()))?;
            if !output.status.success() || !out.exists() {
                return Err(CoreError::external(
                    "ffmpeg",
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                ));
            }
        }

        debug!(source = %source.display(), "poster extracted");
        tokio::fs::read(&out)
            .await
            .map_err(|e| CoreError::io(&out, e))
    }

    /// Transcode to the permanent web-playable proxy.
    pub async fn transcode_proxy(&self, source: &Path, dest: &Path) -> CoreResult<()> {
        let tmp = dest.with_extension("mp4.part");

        let output = Command::new(&self.binary)
            .arg("-i")
            .arg(source)
            .args([
                "-c:v",
                "libx264",
                "-profile:v",
                "main",
                "-crf",
                "23",
                // Cap the longest edge at 1920, keep even dimensions.
                "-vf",
                "scale='if(gt(iw,ih),min(1920,iw),-2)':'if(gt(iw,ih),-2,min(1920,ih))'",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
                "-y",
            ])
            .arg(&tmp)
            .output()
            .await
            .map_err(|e| CoreError::external("ffmpeg", e.to_string()))?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::external(
                "ffmpeg",
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        tokio::fs::rename(&tmp, dest)
            .await
            .map_err(|e| CoreError::io(dest, e))?;
        info!(dest = %dest.display(), "proxy transcode complete");
        Ok(())
    }
}
