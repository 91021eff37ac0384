//! Background job execution
//!
//! The dispatcher behind the worker pool: thumbnail tiers, RAW/HEIC
//! previews, video posters, permanent proxies, and metadata refreshes.

use crate::catalog::Catalog;
use crate::derivatives::DerivativeGenerator;
use crate::domain::media::{is_raw_or_heic, MediaKind, MediaMeta, PreviewQuality};
use crate::infrastructure::events::{AssetKind, Event};
use crate::infrastructure::jobs::{
    ClaimedJob, JobDispatcher, JobPayload, JobQueue, JobResult, JobRunContext,
};
use crate::probe::MetadataProbe;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

pub struct ArchiveDispatcher {
    catalog: Catalog,
    probe: MetadataProbe,
    derivatives: DerivativeGenerator,
    queues: JobQueue,
}

impl ArchiveDispatcher {
    pub fn new(
        catalog: Catalog,
        probe: MetadataProbe,
        derivatives: DerivativeGenerator,
        queues: JobQueue,
    ) -> Self {
        Self {
            catalog,
            probe,
            derivatives,
            queues,
        }
    }

    async fn run_thumbnail(
        &self,
        sha: &str,
        kind: MediaKind,
        archived_path: &str,
        ctx: &JobRunContext,
    ) -> JobResult<()> {
        let source = Path::new(archived_path);
        ctx.progress(10.0, Some("probing".into()));

        let (preview, quality) = if kind == MediaKind::Image && is_raw_or_heic(source) {
            match self.probe.extract_preview(source).await {
                Some(preview) => {
                    let quality = preview.quality;
                    (Some(preview), Some(quality))
                }
                // No extractable preview; import proceeded without one.
                None => {
                    debug!(sha, "no embedded preview available");
                    (None, Some(PreviewQuality::Low))
                }
            }
        } else {
            (None, None)
        };

        if kind == MediaKind::Image && is_raw_or_heic(source) && preview.is_none() {
            // Nothing renderable; leave the row without thumbnails.
            return Ok(());
        }

        ctx.check_cancelled().await?;
        ctx.progress(40.0, Some("rendering".into()));

        let orientation = match self.probe.probe(source, MediaKind::Image).await {
            Ok(MediaMeta::Image(meta)) => meta.orientation,
            _ => None,
        };

        let rendered = self
            .derivatives
            .image_derivatives(sha, source, preview.as_ref(), orientation)
            .await?;
        self.catalog
            .record_image_derivatives(sha, &rendered, quality)
            .await
            .map_err(|e| crate::infrastructure::jobs::JobError::execution(e.to_string()))?;

        // Embedded/low DNG previews are worth a higher-quality re-render.
        let is_dng = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("dng"))
            .unwrap_or(false);
        if is_dng && quality.is_some_and(|q| q != PreviewQuality::Full) {
            self.queues
                .enqueue(JobPayload::DngRerender {
                    sha: sha.to_string(),
                    archived_path: archived_path.to_string(),
                })
                .await?;
        }

        ctx.progress(100.0, None);
        for asset in [AssetKind::ThumbSmall, AssetKind::ThumbLarge] {
            ctx.events().emit(Event::AssetReady {
                kind,
                sha: sha.to_string(),
                asset,
            });
        }
        if rendered.preview.is_some() {
            ctx.events().emit(Event::AssetReady {
                kind,
                sha: sha.to_string(),
                asset: AssetKind::Preview,
            });
        }
        Ok(())
    }

    async fn run_dng_rerender(
        &self,
        sha: &str,
        archived_path: &str,
        ctx: &JobRunContext,
    ) -> JobResult<()> {
        let source = Path::new(archived_path);
        ctx.progress(20.0, Some("decoding DNG".into()));

        // Full decode beats the embedded preview when the decoder can read
        // the file; otherwise the embedded derivatives stand.
        match self
            .derivatives
            .image_derivatives(sha, source, None, None)
            .await
        {
            Ok(rendered) => {
                self.catalog
                    .record_image_derivatives(sha, &rendered, Some(PreviewQuality::Full))
                    .await
                    .map_err(|e| {
                        crate::infrastructure::jobs::JobError::execution(e.to_string())
                    })?;
                ctx.progress(100.0, None);
                Ok(())
            }
            Err(e) => {
                debug!(sha, error = %e, "full DNG decode unavailable, keeping embedded preview");
                Ok(())
            }
        }
    }

    async fn run_poster(
        &self,
        sha: &str,
        archived_path: &str,
        ctx: &JobRunContext,
    ) -> JobResult<()> {
        ctx.progress(20.0, Some("extracting poster".into()));
        let rendered = self
            .derivatives
            .video_poster(sha, Path::new(archived_path))
            .await?;
        self.catalog
            .record_video_poster(sha, &rendered)
            .await
            .map_err(|e| crate::infrastructure::jobs::JobError::execution(e.to_string()))?;
        ctx.progress(100.0, None);
        ctx.events().emit(Event::AssetReady {
            kind: MediaKind::Video,
            sha: sha.to_string(),
            asset: AssetKind::Poster,
        });
        Ok(())
    }

    async fn run_proxy(
        &self,
        sha: &str,
        archived_path: &str,
        ctx: &JobRunContext,
    ) -> JobResult<()> {
        ctx.progress(5.0, Some("transcoding".into()));
        ctx.check_cancelled().await?;
        let proxy_path = self
            .derivatives
            .video_proxy(sha, Path::new(archived_path))
            .await?;
        self.catalog
            .record_video_proxy(sha, &proxy_path)
            .await
            .map_err(|e| crate::infrastructure::jobs::JobError::execution(e.to_string()))?;
        ctx.progress(100.0, None);
        ctx.events().emit(Event::AssetReady {
            kind: MediaKind::Video,
            sha: sha.to_string(),
            asset: AssetKind::Proxy,
        });
        Ok(())
    }

    async fn run_metadata(
        &self,
        sha: &str,
        kind: MediaKind,
        archived_path: &str,
        ctx: &JobRunContext,
    ) -> JobResult<()> {
        ctx.progress(30.0, Some("probing".into()));
        let meta = self.probe.probe(Path::new(archived_path), kind).await?;
        match meta {
            MediaMeta::Image(meta) => {
                self.catalog
                    .refresh_image_metadata(sha, &meta)
                    .await
                    .map_err(|e| crate::infrastructure::jobs::JobError::execution(e.to_string()))?;
            }
            MediaMeta::Video(meta) => {
                self.catalog
                    .refresh_video_metadata(sha, &meta)
                    .await
                    .map_err(|e| crate::infrastructure::jobs::JobError::execution(e.to_string()))?;
            }
            MediaMeta::Document(_) => {}
        }
        ctx.progress(100.0, None);
        ctx.events().emit(Event::AssetReady {
            kind,
            sha: sha.to_string(),
            asset: AssetKind::Metadata,
        });
        Ok(())
    }
}

#[async_trait]
impl JobDispatcher for ArchiveDispatcher {
    async fn dispatch(&self, job: &ClaimedJob, ctx: &JobRunContext) -> JobResult<()> {
        ctx.check_cancelled().await?;
        match &job.payload {
            JobPayload::Thumbnail {
                sha,
                kind,
                archived_path,
            } => self.run_thumbnail(sha, *kind, archived_path, ctx).await,
            JobPayload::DngRerender { sha, archived_path } => {
                self.run_dng_rerender(sha, archived_path, ctx).await
            }
            JobPayload::Poster { sha, archived_path } => {
                self.run_poster(sha, archived_path, ctx).await
            }
            JobPayload::Proxy { sha, archived_path } => {
                self.run_proxy(sha, archived_path, ctx).await
            }
            JobPayload::Metadata {
                sha,
                kind,
                archived_path,
            } => self.run_metadata(sha, *kind, archived_path, ctx).await,
        }
    }
}
