//! Core types for the job system

use crate::domain::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const QUEUE_THUMBNAIL: &str = "thumbnail";
pub const QUEUE_METADATA: &str = "metadata";
pub const QUEUE_PROXY: &str = "proxy";

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Typed job payloads. The `type` tag is what lands in the payload JSON
/// column; `queue()` routes each variant to its queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    /// Generate both thumbnail tiers (and the preview for RAW/HEIC).
    Thumbnail {
        sha: String,
        kind: MediaKind,
        archived_path: String,
    },
    /// Re-probe metadata and refresh the denormalized columns.
    Metadata {
        sha: String,
        kind: MediaKind,
        archived_path: String,
    },
    /// Extract a poster frame for a video.
    Poster { sha: String, archived_path: String },
    /// One-time permanent web-playable transcode.
    Proxy { sha: String, archived_path: String },
    /// Re-render a DNG preview at higher quality than its embedded preview.
    DngRerender { sha: String, archived_path: String },
}

impl JobPayload {
    pub fn queue(&self) -> &'static str {
        match self {
            JobPayload::Thumbnail { .. } | JobPayload::Poster { .. } | JobPayload::DngRerender { .. } => {
                QUEUE_THUMBNAIL
            }
            JobPayload::Metadata { .. } => QUEUE_METADATA,
            JobPayload::Proxy { .. } => QUEUE_PROXY,
        }
    }

    pub fn sha(&self) -> &str {
        match self {
            JobPayload::Thumbnail { sha, .. }
            | JobPayload::Metadata { sha, .. }
            | JobPayload::Poster { sha, .. }
            | JobPayload::Proxy { sha, .. }
            | JobPayload::DngRerender { sha, .. } => sha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_routing() {
        let thumb = JobPayload::Thumbnail {
            sha: "ab".repeat(32),
            kind: MediaKind::Image,
            archived_path: "/a/b".into(),
        };
        assert_eq!(thumb.queue(), QUEUE_THUMBNAIL);

        let proxy = JobPayload::Proxy {
            sha: "ab".repeat(32),
            archived_path: "/a/b".into(),
        };
        assert_eq!(proxy.queue(), QUEUE_PROXY);
    }

    #[test]
    fn payload_roundtrips_as_json() {
        let payload = JobPayload::Metadata {
            sha: "cd".repeat(32),
            kind: MediaKind::Video,
            archived_path: "/v.mp4".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "metadata");
        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.sha(), payload.sha());
    }
}
