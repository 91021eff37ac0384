//! Media operations

use crate::catalog::media::MediaRecord;
use crate::domain::import::{ImportReport, ImportRequest};
use crate::domain::media::MediaKind;
use crate::shared::error::CoreResult;
use crate::Archive;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ImportSessionSummary {
    pub import_id: Uuid,
    pub locid: Uuid,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub image_count: i32,
    pub video_count: i32,
    pub document_count: i32,
    pub duplicate_count: i32,
    pub error_count: i32,
}

impl Archive {
    /// Run a full import session to completion.
    pub async fn import(&self, request: ImportRequest) -> CoreResult<ImportReport> {
        self.pipeline.start(request).await
    }

    /// Request cooperative cancellation of a running session.
    pub fn cancel_import(&self, import_id: Uuid) {
        self.pipeline.cancel(import_id);
    }

    /// Resume an interrupted session.
    pub async fn resume_import(&self, import_id: Uuid) -> CoreResult<ImportReport> {
        self.pipeline.resume(import_id).await
    }

    /// Sessions eligible for resume after a crash.
    pub async fn resumable_sessions(&self) -> CoreResult<Vec<ImportSessionSummary>> {
        Ok(self
            .catalog
            .resumable_sessions()
            .await?
            .into_iter()
            .map(summarize)
            .collect())
    }

    /// Recent sessions, newest first.
    pub async fn import_status(&self, limit: u64) -> CoreResult<Vec<ImportSessionSummary>> {
        Ok(self
            .catalog
            .recent_imports(limit)
            .await?
            .into_iter()
            .map(summarize)
            .collect())
    }

    pub async fn media_by_location(&self, locid: Uuid) -> CoreResult<Vec<MediaRecord>> {
        self.catalog.media_by_location(locid).await
    }

    /// Delete a media row and its blob (including derivatives). The hash is
    /// the identity, so removing the row orphans the blob by definition.
    pub async fn delete_media(&self, sha: &str, kind: MediaKind) -> CoreResult<()> {
        self.catalog.delete_media_row(sha, kind).await?;
        self.store.delete(sha).await?;
        Ok(())
    }

    pub async fn move_to_sublocation(
        &self,
        sha: &str,
        kind: MediaKind,
        subid: Option<Uuid>,
    ) -> CoreResult<()> {
        self.catalog.move_to_sublocation(sha, kind, subid).await
    }

    pub async fn set_media_hidden(
        &self,
        sha: &str,
        kind: MediaKind,
        hidden: bool,
        reason: Option<&str>,
    ) -> CoreResult<()> {
        self.catalog.set_hidden(sha, kind, hidden, reason).await
    }
}

fn summarize(m: crate::infrastructure::database::entities::import::Model) -> ImportSessionSummary {
    ImportSessionSummary {
        import_id: m.import_id,
        locid: m.locid,
        status: m.status,
        started_at: m.started_at,
        completed_at: m.completed_at,
        image_count: m.image_count,
        video_count: m.video_count,
        document_count: m.document_count,
        duplicate_count: m.duplicate_count,
        error_count: m.error_count,
    }
}
