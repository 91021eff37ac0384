//! Derivative maintenance operations
//!
//! Bulk regeneration enqueues background jobs; nothing blocks the caller.

use crate::infrastructure::jobs::JobPayload;
use crate::domain::media::MediaKind;
use crate::shared::error::{CoreError, CoreResult};
use crate::Archive;
use tracing::info;

impl Archive {
    /// Queue a thumbnail rebuild for every image. Without `force`, images
    /// that already have both tiers are skipped.
    pub async fn regenerate_all_thumbnails(&self, force: bool) -> CoreResult<usize> {
        let mut queued = 0usize;
        for row in self.catalog.all_images().await? {
            if !force && row.thumb_path_sm.is_some() && row.thumb_path_lg.is_some() {
                continue;
            }
            self.queues
                .enqueue(JobPayload::Thumbnail {
                    sha: row.imghash,
                    kind: MediaKind::Image,
                    archived_path: row.archived_path,
                })
                .await
                .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
            queued += 1;
        }
        info!(queued, force, "thumbnail regeneration queued");
        Ok(queued)
    }

    /// Queue poster extraction for every video missing one (or all, with
    /// `force`).
    pub async fn regenerate_video_posters(&self, force: bool) -> CoreResult<usize> {
        let mut queued = 0usize;
        for row in self.catalog.all_videos().await? {
            if !force && row.poster_extracted {
                continue;
            }
            self.queues
                .enqueue(JobPayload::Poster {
                    sha: row.vidhash,
                    archived_path: row.archived_path,
                })
                .await
                .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
            queued += 1;
        }
        info!(queued, force, "poster regeneration queued");
        Ok(queued)
    }

    /// Queue a high-quality re-render for every DNG whose preview came from
    /// an embedded (or worse) source.
    pub async fn regenerate_dng_previews(&self) -> CoreResult<usize> {
        let mut queued = 0usize;
        for row in self.catalog.images_with_extension("dng").await? {
            if row.preview_quality.as_deref() == Some("full") {
                continue;
            }
            self.queues
                .enqueue(JobPayload::DngRerender {
                    sha: row.imghash,
                    archived_path: row.archived_path,
                })
                .await
                .map_err(|e| CoreError::internal(format!("enqueue failed: {e}")))?;
            queued += 1;
        }
        info!(queued, "DNG preview re-render queued");
        Ok(queued)
    }
}
