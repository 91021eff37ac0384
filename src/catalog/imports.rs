//! Import session and planned-file repository
//!
//! The pipeline checkpoints through these methods; every state change is
//! durable before the next step starts.

use super::Catalog;
use crate::domain::import::{ImportOptions, ImportState, PlannedFileState};
use crate::domain::media::MediaKind;
use crate::infrastructure::database::entities::{import, planned_file};
use crate::shared::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use std::str::FromStr;
use uuid::Uuid;

/// A planned file with its durable pipeline state.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub id: i64,
    pub import_id: Uuid,
    pub source_path: String,
    pub stem: String,
    pub kind: MediaKind,
    pub state: PlannedFileState,
    pub sha256: Option<String>,
    pub file_size: Option<i64>,
    pub archived_path: Option<String>,
    pub sidecar_of: Option<String>,
    pub warnings_json: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl From<planned_file::Model> for PlannedFile {
    fn from(m: planned_file::Model) -> Self {
        Self {
            id: m.id,
            import_id: m.import_id,
            source_path: m.source_path,
            stem: m.stem,
            kind: MediaKind::from_str(&m.kind).unwrap_or(MediaKind::Skip),
            state: PlannedFileState::from_str(&m.state).unwrap_or(PlannedFileState::Error),
            sha256: m.sha256,
            file_size: m.file_size,
            archived_path: m.archived_path,
            sidecar_of: m.sidecar_of,
            warnings_json: m.warnings_json,
            error_message: m.error_message,
        }
    }
}

impl Catalog {
    pub async fn create_import_session(
        &self,
        import_id: Uuid,
        locid: Uuid,
        subid: Option<Uuid>,
        options: &ImportOptions,
        notes: Option<String>,
    ) -> CoreResult<()> {
        import::ActiveModel {
            import_id: Set(import_id),
            locid: Set(locid),
            subid: Set(subid),
            status: Set(ImportState::Pending.to_string()),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            auth_imp: Set(options.actor.clone()),
            image_count: Set(0),
            video_count: Set(0),
            document_count: Set(0),
            map_count: Set(0),
            duplicate_count: Set(0),
            error_count: Set(0),
            delete_originals: Set(options.delete_originals),
            use_hardlinks: Set(options.use_hardlinks),
            verify_checksums: Set(options.verify_checksums),
            notes: Set(notes),
        }
        .insert(self.conn())
        .await?;
        Ok(())
    }

    pub async fn get_import_session(&self, import_id: Uuid) -> CoreResult<import::Model> {
        import::Entity::find_by_id(import_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| CoreError::not_found("import", import_id))
    }

    pub async fn set_import_state(&self, import_id: Uuid, state: ImportState) -> CoreResult<()> {
        let mut update = import::Entity::update_many()
            .col_expr(import::Column::Status, Expr::value(state.to_string()));
        if state.is_terminal() {
            update = update.col_expr(import::Column::CompletedAt, Expr::value(Utc::now()));
        }
        update
            .filter(import::Column::ImportId.eq(import_id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn bump_import_counts(
        &self,
        import_id: Uuid,
        kind: Option<MediaKind>,
        duplicate: bool,
        error: bool,
    ) -> CoreResult<()> {
        let session = self.get_import_session(import_id).await?;
        let mut model: import::ActiveModel = session.into();
        if let Some(kind) = kind {
            match kind {
                MediaKind::Image => {
                    model.image_count = Set(model.image_count.take().unwrap_or(0) + 1)
                }
                MediaKind::Video => {
                    model.video_count = Set(model.video_count.take().unwrap_or(0) + 1)
                }
                MediaKind::Document => {
                    model.document_count = Set(model.document_count.take().unwrap_or(0) + 1)
                }
                MediaKind::Map => model.map_count = Set(model.map_count.take().unwrap_or(0) + 1),
                _ => {}
            }
        }
        if duplicate {
            model.duplicate_count = Set(model.duplicate_count.take().unwrap_or(0) + 1);
        }
        if error {
            model.error_count = Set(model.error_count.take().unwrap_or(0) + 1);
        }
        model.update(self.conn()).await?;
        Ok(())
    }

    /// Sessions that were interrupted mid-flight and can be resumed.
    pub async fn resumable_sessions(&self) -> CoreResult<Vec<import::Model>> {
        let rows = import::Entity::find()
            .order_by_desc(import::Column::StartedAt)
            .all(self.conn())
            .await?;
        Ok(rows
            .into_iter()
            .filter(|m| {
                ImportState::from_str(&m.status)
                    .map(|s| s.is_resumable())
                    .unwrap_or(false)
            })
            .collect())
    }

    pub async fn recent_imports(&self, limit: u64) -> CoreResult<Vec<import::Model>> {
        use sea_orm::QuerySelect;
        Ok(import::Entity::find()
            .order_by_desc(import::Column::StartedAt)
            .limit(limit)
            .all(self.conn())
            .await?)
    }

    pub async fn insert_planned_file(
        &self,
        import_id: Uuid,
        source_path: &str,
        stem: &str,
        kind: MediaKind,
        sidecar_of: Option<&str>,
    ) -> CoreResult<()> {
        let state = match kind {
            MediaKind::Sidecar => PlannedFileState::SidecarOnly,
            MediaKind::Skip => PlannedFileState::Skipped,
            _ => PlannedFileState::Planned,
        };
        let result = planned_file::ActiveModel {
            import_id: Set(import_id),
            source_path: Set(source_path.to_string()),
            stem: Set(stem.to_string()),
            kind: Set(kind.to_string()),
            state: Set(state.to_string()),
            sha256: Set(None),
            file_size: Set(None),
            archived_path: Set(None),
            sidecar_of: Set(sidecar_of.map(str::to_string)),
            warnings_json: Set(None),
            error_message: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await;
        match result {
            Ok(_) => Ok(()),
            // Unique (import_id, source_path): re-scan on resume is a no-op.
            Err(e) if e.to_string().contains("UNIQUE") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn planned_files(&self, import_id: Uuid) -> CoreResult<Vec<PlannedFile>> {
        let rows = planned_file::Entity::find()
            .filter(planned_file::Column::ImportId.eq(import_id))
            .order_by_asc(planned_file::Column::Id)
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn set_planned_file_hashed(
        &self,
        id: i64,
        sha: &str,
        file_size: i64,
    ) -> CoreResult<()> {
        planned_file::Entity::update_many()
            .col_expr(
                planned_file::Column::State,
                Expr::value(PlannedFileState::Hashed.to_string()),
            )
            .col_expr(planned_file::Column::Sha256, Expr::value(sha))
            .col_expr(planned_file::Column::FileSize, Expr::value(file_size))
            .col_expr(planned_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(planned_file::Column::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn set_planned_file_state(
        &self,
        id: i64,
        state: PlannedFileState,
    ) -> CoreResult<()> {
        planned_file::Entity::update_many()
            .col_expr(planned_file::Column::State, Expr::value(state.to_string()))
            .col_expr(planned_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(planned_file::Column::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn set_planned_file_placed(&self, id: i64, archived_path: &str) -> CoreResult<()> {
        planned_file::Entity::update_many()
            .col_expr(
                planned_file::Column::State,
                Expr::value(PlannedFileState::Placed.to_string()),
            )
            .col_expr(
                planned_file::Column::ArchivedPath,
                Expr::value(archived_path),
            )
            .col_expr(planned_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(planned_file::Column::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn set_planned_file_error(&self, id: i64, message: &str) -> CoreResult<()> {
        planned_file::Entity::update_many()
            .col_expr(
                planned_file::Column::State,
                Expr::value(PlannedFileState::Error.to_string()),
            )
            .col_expr(planned_file::Column::ErrorMessage, Expr::value(message))
            .col_expr(planned_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(planned_file::Column::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    pub async fn set_planned_file_warnings(
        &self,
        id: i64,
        warnings: &serde_json::Value,
    ) -> CoreResult<()> {
        planned_file::Entity::update_many()
            .col_expr(
                planned_file::Column::WarningsJson,
                Expr::value(warnings.clone()),
            )
            .col_expr(planned_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(planned_file::Column::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }
}
