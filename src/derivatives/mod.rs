//! Derivative generation
//!
//! Thumbnail tiers, RAW/HEIC previews, video posters and permanent proxies.
//! Every write goes through the content store's atomic temp-and-rename path,
//! so regeneration is always safe.

pub mod thumbnailer;
pub mod video;

use crate::content::store::{ContentStore, ThumbTier};
use crate::probe::raw::ExtractedPreview;
use crate::shared::error::CoreResult;
use std::path::Path;
use std::sync::Arc;

/// Paths produced for one image.
#[derive(Debug, Clone, Default)]
pub struct ImageDerivatives {
    pub thumb_sm: Option<String>,
    pub thumb_lg: Option<String>,
    pub preview: Option<String>,
}

#[derive(Clone)]
pub struct DerivativeGenerator {
    store: ContentStore,
    transcoder: Arc<video::Transcoder>,
}

impl DerivativeGenerator {
    pub fn new(store: ContentStore) -> Self {
        Self {
            store,
            transcoder: Arc::new(video::Transcoder::default()),
        }
    }

    pub fn with_transcoder(store: ContentStore, transcoder: video::Transcoder) -> Self {
        Self {
            store,
            transcoder: Arc::new(transcoder),
        }
    }

    /// Generate both thumbnail tiers for an image blob.
    ///
    /// For RAW/HEIC the embedded preview stands in for the unreadable
    /// original: it is written to the preview tree and the thumbnails are
    /// derived from it. `orientation` is the EXIF orientation tag; rotation
    /// is baked into every derivative.
    pub async fn image_derivatives(
        &self,
        sha: &str,
        source: &Path,
        preview: Option<&ExtractedPreview>,
        orientation: Option<u32>,
    ) -> CoreResult<ImageDerivatives> {
        let mut out = ImageDerivatives::default();

        let source_bytes: Vec<u8> = match preview {
            Some(p) => {
                let preview_path = self.store.preview_path(sha);
                self.store
                    .write_derivative(&preview_path, &p.jpeg_bytes)
                    .await?;
                out.preview = Some(preview_path.to_string_lossy().into_owned());
                p.jpeg_bytes.clone()
            }
            None => tokio::fs::read(source)
                .await
                .map_err(|e| crate::shared::error::CoreError::io(source, e))?,
        };

        for tier in [ThumbTier::Small, ThumbTier::Large] {
            let jpeg = thumbnailer::render_thumbnail(
                source_bytes.clone(),
                tier.max_edge(),
                orientation,
            )
            .await?;
            let dest = self.store.thumb_path(sha, tier);
            self.store.write_derivative(&dest, &jpeg).await?;
            match tier {
                ThumbTier::Small => out.thumb_sm = Some(dest.to_string_lossy().into_owned()),
                ThumbTier::Large => out.thumb_lg = Some(dest.to_string_lossy().into_owned()),
            }
        }

        Ok(out)
    }

    /// Extract a poster still for a video and derive thumbnail tiers from
    /// it. The poster lands in the preview tree.
    pub async fn video_poster(&self, sha: &str, source: &Path) -> CoreResult<ImageDerivatives> {
        let poster_jpeg = self.transcoder.extract_poster(source).await?;

        let preview_path = self.store.preview_path(sha);
        self.store
            .write_derivative(&preview_path, &poster_jpeg)
            .await?;

        let mut out = ImageDerivatives {
            preview: Some(preview_path.to_string_lossy().into_owned()),
            ..Default::default()
        };

        for tier in [ThumbTier::Small, ThumbTier::Large] {
            let jpeg =
                thumbnailer::render_thumbnail(poster_jpeg.clone(), tier.max_edge(), None).await?;
            let dest = self.store.thumb_path(sha, tier);
            self.store.write_derivative(&dest, &jpeg).await?;
            match tier {
                ThumbTier::Small => out.thumb_sm = Some(dest.to_string_lossy().into_owned()),
                ThumbTier::Large => out.thumb_lg = Some(dest.to_string_lossy().into_owned()),
            }
        }

        Ok(out)
    }

    /// One-time web-playable proxy transcode. The output is permanent; a
    /// pre-existing proxy short-circuits.
    pub async fn video_proxy(&self, sha: &str, source: &Path) -> CoreResult<String> {
        let dest = self.store.proxy_path(sha);
        if tokio::fs::metadata(&dest).await.is_ok() {
            return Ok(dest.to_string_lossy().into_owned());
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| crate::shared::error::CoreError::io(parent, e))?;
        }
        self.transcoder.transcode_proxy(source, &dest).await?;
        Ok(dest.to_string_lossy().into_owned())
    }
}
