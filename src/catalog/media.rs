//! Media row repository
//!
//! One row per hash per kind table; the hash is the identity. Inserts happen
//! in the pipeline's finalize step, one transaction per file.

use super::Catalog;
use crate::derivatives::ImageDerivatives;
use crate::domain::media::{DocumentMeta, ImageMeta, MediaKind, PreviewQuality, VideoMeta};
use crate::shared::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use crate::infrastructure::database::entities::{document, image, video};

/// A kind-agnostic projection of a media row for listings and fixity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MediaRecord {
    pub hash: String,
    pub kind: MediaKind,
    pub original_name: String,
    pub archived_path: String,
    pub locid: Option<Uuid>,
    pub subid: Option<Uuid>,
    pub import_id: Option<Uuid>,
    pub hidden: bool,
    pub file_size_bytes: i64,
    pub thumb_path_sm: Option<String>,
    pub preview_path: Option<String>,
    pub proxy_path: Option<String>,
}

/// Inputs for a finalize-step insert.
#[derive(Debug, Clone)]
pub struct NewMediaRow {
    pub sha: String,
    pub kind: MediaKind,
    pub original_name: String,
    pub original_path: String,
    pub archived_path: String,
    pub locid: Uuid,
    pub subid: Option<Uuid>,
    pub import_id: Uuid,
    pub file_size_bytes: i64,
    pub image_meta: Option<ImageMeta>,
    pub video_meta: Option<VideoMeta>,
    pub document_meta: Option<DocumentMeta>,
}

impl Catalog {
    /// Which kind table, if any, already holds this hash.
    pub async fn media_kind_of(&self, sha: &str) -> CoreResult<Option<MediaKind>> {
        if image::Entity::find_by_id(sha.to_string())
            .one(self.conn())
            .await?
            .is_some()
        {
            return Ok(Some(MediaKind::Image));
        }
        if video::Entity::find_by_id(sha.to_string())
            .one(self.conn())
            .await?
            .is_some()
        {
            return Ok(Some(MediaKind::Video));
        }
        if document::Entity::find_by_id(sha.to_string())
            .one(self.conn())
            .await?
            .is_some()
        {
            return Ok(Some(MediaKind::Document));
        }
        Ok(None)
    }

    pub async fn insert_media_row(&self, row: NewMediaRow) -> CoreResult<()> {
        let now = Utc::now();
        match row.kind {
            MediaKind::Image => {
                let meta = row.image_meta.unwrap_or_default();
                image::ActiveModel {
                    imghash: Set(row.sha),
                    original_name: Set(row.original_name),
                    original_path: Set(row.original_path),
                    archived_path: Set(row.archived_path),
                    locid: Set(Some(row.locid)),
                    subid: Set(row.subid),
                    import_id: Set(Some(row.import_id)),
                    imgadd: Set(now),
                    exif_json: Set(meta.raw_exif_json),
                    width: Set(meta.width.map(|w| w as i32)),
                    height: Set(meta.height.map(|h| h as i32)),
                    date_taken: Set(meta.date_taken),
                    camera_make: Set(meta.camera_make),
                    camera_model: Set(meta.camera_model),
                    gps_lat: Set(meta.gps_lat),
                    gps_lng: Set(meta.gps_lng),
                    thumb_path_sm: Set(None),
                    thumb_path_lg: Set(None),
                    preview_path: Set(None),
                    preview_quality: Set(None),
                    xmp_synced: Set(false),
                    hidden: Set(false),
                    hidden_reason: Set(None),
                    is_live_photo: Set(false),
                    file_size_bytes: Set(row.file_size_bytes),
                }
                .insert(self.conn())
                .await?;
            }
            MediaKind::Video => {
                let meta = row.video_meta.unwrap_or_default();
                video::ActiveModel {
                    vidhash: Set(row.sha),
                    original_name: Set(row.original_name),
                    original_path: Set(row.original_path),
                    archived_path: Set(row.archived_path),
                    locid: Set(Some(row.locid)),
                    subid: Set(row.subid),
                    import_id: Set(Some(row.import_id)),
                    vidadd: Set(now),
                    probe_json: Set(meta.raw_probe_json),
                    duration_s: Set(meta.duration_s),
                    width: Set(meta.width.map(|w| w as i32)),
                    height: Set(meta.height.map(|h| h as i32)),
                    codec: Set(meta.codec),
                    fps: Set(meta.fps),
                    date_taken: Set(meta.date_taken),
                    gps_lat: Set(meta.gps_lat),
                    gps_lng: Set(meta.gps_lng),
                    thumb_path_sm: Set(None),
                    thumb_path_lg: Set(None),
                    poster_extracted: Set(false),
                    proxy_path: Set(None),
                    hidden: Set(false),
                    hidden_reason: Set(None),
                    is_live_photo: Set(false),
                    file_size_bytes: Set(row.file_size_bytes),
                }
                .insert(self.conn())
                .await?;
            }
            MediaKind::Document => {
                let meta = row.document_meta.unwrap_or_default();
                document::ActiveModel {
                    dochash: Set(row.sha),
                    original_name: Set(row.original_name),
                    original_path: Set(row.original_path),
                    archived_path: Set(row.archived_path),
                    locid: Set(Some(row.locid)),
                    subid: Set(row.subid),
                    import_id: Set(Some(row.import_id)),
                    docadd: Set(now),
                    page_count: Set(meta.page_count.map(|p| p as i32)),
                    author: Set(meta.author),
                    title: Set(meta.title),
                    hidden: Set(false),
                    hidden_reason: Set(None),
                    file_size_bytes: Set(row.file_size_bytes),
                }
                .insert(self.conn())
                .await?;
            }
            other => {
                return Err(CoreError::validation(format!(
                    "kind {other} has no media table"
                )))
            }
        }
        Ok(())
    }

    pub async fn media_by_location(&self, locid: Uuid) -> CoreResult<Vec<MediaRecord>> {
        let mut records = Vec::new();

        for m in image::Entity::find()
            .filter(image::Column::Locid.eq(locid))
            .all(self.conn())
            .await?
        {
            records.push(MediaRecord {
                hash: m.imghash,
                kind: MediaKind::Image,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: m.thumb_path_sm,
                preview_path: m.preview_path,
                proxy_path: None,
            });
        }
        for m in video::Entity::find()
            .filter(video::Column::Locid.eq(locid))
            .all(self.conn())
            .await?
        {
            records.push(MediaRecord {
                hash: m.vidhash,
                kind: MediaKind::Video,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: m.thumb_path_sm,
                preview_path: None,
                proxy_path: m.proxy_path,
            });
        }
        for m in document::Entity::find()
            .filter(document::Column::Locid.eq(locid))
            .all(self.conn())
            .await?
        {
            records.push(MediaRecord {
                hash: m.dochash,
                kind: MediaKind::Document,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: None,
                preview_path: None,
                proxy_path: None,
            });
        }

        Ok(records)
    }

    /// All media rows, projected for fixity and integrity sweeps.
    pub async fn all_media(&self) -> CoreResult<Vec<MediaRecord>> {
        let mut records = Vec::new();
        for m in image::Entity::find().all(self.conn()).await? {
            records.push(MediaRecord {
                hash: m.imghash,
                kind: MediaKind::Image,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: m.thumb_path_sm,
                preview_path: m.preview_path,
                proxy_path: None,
            });
        }
        for m in video::Entity::find().all(self.conn()).await? {
            records.push(MediaRecord {
                hash: m.vidhash,
                kind: MediaKind::Video,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: m.thumb_path_sm,
                preview_path: None,
                proxy_path: m.proxy_path,
            });
        }
        for m in document::Entity::find().all(self.conn()).await? {
            records.push(MediaRecord {
                hash: m.dochash,
                kind: MediaKind::Document,
                original_name: m.original_name,
                archived_path: m.archived_path,
                locid: m.locid,
                subid: m.subid,
                import_id: m.import_id,
                hidden: m.hidden,
                file_size_bytes: m.file_size_bytes,
                thumb_path_sm: None,
                preview_path: None,
                proxy_path: None,
            });
        }
        Ok(records)
    }

    /// Delete a media row. The caller removes the blob afterwards; hero
    /// references are cleared here so they never dangle.
    pub async fn delete_media_row(&self, sha: &str, kind: MediaKind) -> CoreResult<()> {
        let affected = match kind {
            MediaKind::Image => {
                self.clear_hero_references(sha).await?;
                image::Entity::delete_by_id(sha.to_string())
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Video => {
                video::Entity::delete_by_id(sha.to_string())
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Document => {
                document::Entity::delete_by_id(sha.to_string())
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            other => return Err(CoreError::validation(format!("kind {other} has no media table"))),
        };
        if affected == 0 {
            return Err(CoreError::not_found("media", sha));
        }
        Ok(())
    }

    pub async fn move_to_sublocation(
        &self,
        sha: &str,
        kind: MediaKind,
        subid: Option<Uuid>,
    ) -> CoreResult<()> {
        let value = Expr::value(subid.map_or(sea_orm::Value::Uuid(None), |id| id.into()));
        let affected = match kind {
            MediaKind::Image => {
                image::Entity::update_many()
                    .col_expr(image::Column::Subid, value)
                    .filter(image::Column::Imghash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Video => {
                video::Entity::update_many()
                    .col_expr(video::Column::Subid, value)
                    .filter(video::Column::Vidhash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Document => {
                document::Entity::update_many()
                    .col_expr(document::Column::Subid, value)
                    .filter(document::Column::Dochash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            other => return Err(CoreError::validation(format!("kind {other} has no media table"))),
        };
        if affected == 0 {
            return Err(CoreError::not_found("media", sha));
        }
        Ok(())
    }

    pub async fn set_hidden(
        &self,
        sha: &str,
        kind: MediaKind,
        hidden: bool,
        reason: Option<&str>,
    ) -> CoreResult<()> {
        let reason_value = Expr::value(match (hidden, reason) {
            (true, Some(r)) => sea_orm::Value::String(Some(Box::new(r.to_string()))),
            _ => sea_orm::Value::String(None),
        });
        let affected = match kind {
            MediaKind::Image => {
                image::Entity::update_many()
                    .col_expr(image::Column::Hidden, Expr::value(hidden))
                    .col_expr(image::Column::HiddenReason, reason_value)
                    .filter(image::Column::Imghash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Video => {
                video::Entity::update_many()
                    .col_expr(video::Column::Hidden, Expr::value(hidden))
                    .col_expr(video::Column::HiddenReason, reason_value)
                    .filter(video::Column::Vidhash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            MediaKind::Document => {
                document::Entity::update_many()
                    .col_expr(document::Column::Hidden, Expr::value(hidden))
                    .col_expr(document::Column::HiddenReason, reason_value)
                    .filter(document::Column::Dochash.eq(sha))
                    .exec(self.conn())
                    .await?
                    .rows_affected
            }
            other => return Err(CoreError::validation(format!("kind {other} has no media table"))),
        };
        if affected == 0 {
            return Err(CoreError::not_found("media", sha));
        }
        Ok(())
    }

    pub async fn record_image_derivatives(
        &self,
        sha: &str,
        derivatives: &ImageDerivatives,
        quality: Option<PreviewQuality>,
    ) -> CoreResult<()> {
        image::Entity::update_many()
            .col_expr(
                image::Column::ThumbPathSm,
                Expr::value(derivatives.thumb_sm.clone()),
            )
            .col_expr(
                image::Column::ThumbPathLg,
                Expr::value(derivatives.thumb_lg.clone()),
            )
            .col_expr(
                image::Column::PreviewPath,
                Expr::value(derivatives.preview.clone()),
            )
            .col_expr(
                image::Column::PreviewQuality,
                Expr::value(quality.map(|q| q.to_string())),
            )
            .filter(image::Column::Imghash.eq(sha))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn record_video_poster(
        &self,
        sha: &str,
        derivatives: &ImageDerivatives,
    ) -> CoreResult<()> {
        video::Entity::update_many()
            .col_expr(
                video::Column::ThumbPathSm,
                Expr::value(derivatives.thumb_sm.clone()),
            )
            .col_expr(
                video::Column::ThumbPathLg,
                Expr::value(derivatives.thumb_lg.clone()),
            )
            .col_expr(video::Column::PosterExtracted, Expr::value(true))
            .filter(video::Column::Vidhash.eq(sha))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn record_video_proxy(&self, sha: &str, proxy_path: &str) -> CoreResult<()> {
        video::Entity::update_many()
            .col_expr(video::Column::ProxyPath, Expr::value(proxy_path))
            .filter(video::Column::Vidhash.eq(sha))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    /// Record that an image's XMP sidecar has been synchronized.
    pub async fn set_xmp_synced(&self, sha: &str, synced: bool) -> CoreResult<()> {
        let affected = image::Entity::update_many()
            .col_expr(image::Column::XmpSynced, Expr::value(synced))
            .filter(image::Column::Imghash.eq(sha))
            .exec(self.conn())
            .await?
            .rows_affected;
        if affected == 0 {
            return Err(CoreError::not_found("image", sha));
        }
        Ok(())
    }

    /// Refresh the denormalized EXIF columns from a fresh probe.
    pub async fn refresh_image_metadata(&self, sha: &str, meta: &ImageMeta) -> CoreResult<()> {
        image::Entity::update_many()
            .col_expr(image::Column::ExifJson, Expr::value(meta.raw_exif_json.clone()))
            .col_expr(image::Column::Width, Expr::value(meta.width.map(|w| w as i32)))
            .col_expr(image::Column::Height, Expr::value(meta.height.map(|h| h as i32)))
            .col_expr(image::Column::DateTaken, Expr::value(meta.date_taken))
            .col_expr(image::Column::CameraMake, Expr::value(meta.camera_make.clone()))
            .col_expr(image::Column::CameraModel, Expr::value(meta.camera_model.clone()))
            .col_expr(image::Column::GpsLat, Expr::value(meta.gps_lat))
            .col_expr(image::Column::GpsLng, Expr::value(meta.gps_lng))
            .filter(image::Column::Imghash.eq(sha))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn refresh_video_metadata(&self, sha: &str, meta: &VideoMeta) -> CoreResult<()> {
        video::Entity::update_many()
            .col_expr(video::Column::ProbeJson, Expr::value(meta.raw_probe_json.clone()))
            .col_expr(video::Column::DurationS, Expr::value(meta.duration_s))
            .col_expr(video::Column::Width, Expr::value(meta.width.map(|w| w as i32)))
            .col_expr(video::Column::Height, Expr::value(meta.height.map(|h| h as i32)))
            .col_expr(video::Column::Codec, Expr::value(meta.codec.clone()))
            .col_expr(video::Column::Fps, Expr::value(meta.fps))
            .col_expr(video::Column::DateTaken, Expr::value(meta.date_taken))
            .col_expr(video::Column::GpsLat, Expr::value(meta.gps_lat))
            .col_expr(video::Column::GpsLng, Expr::value(meta.gps_lng))
            .filter(video::Column::Vidhash.eq(sha))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    /// Flag an image/video pair originating from one capture.
    pub async fn mark_live_photo_pair(&self, imghash: &str, vidhash: &str) -> CoreResult<()> {
        image::Entity::update_many()
            .col_expr(image::Column::IsLivePhoto, Expr::value(true))
            .filter(image::Column::Imghash.eq(imghash))
            .exec(self.conn())
            .await?;
        video::Entity::update_many()
            .col_expr(video::Column::IsLivePhoto, Expr::value(true))
            .filter(video::Column::Vidhash.eq(vidhash))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn media_counts(&self) -> CoreResult<(u64, u64, u64)> {
        let images = image::Entity::find().count(self.conn()).await?;
        let videos = video::Entity::find().count(self.conn()).await?;
        let documents = document::Entity::find().count(self.conn()).await?;
        Ok((images, videos, documents))
    }

    pub async fn images_with_extension(&self, ext: &str) -> CoreResult<Vec<image::Model>> {
        let suffix = format!(".{}", ext.to_ascii_lowercase());
        let rows = image::Entity::find().all(self.conn()).await?;
        Ok(rows
            .into_iter()
            .filter(|m| m.archived_path.to_ascii_lowercase().ends_with(&suffix))
            .collect())
    }

    pub async fn all_videos(&self) -> CoreResult<Vec<video::Model>> {
        Ok(video::Entity::find().all(self.conn()).await?)
    }

    pub async fn all_images(&self) -> CoreResult<Vec<image::Model>> {
        Ok(image::Entity::find().all(self.conn()).await?)
    }
}
