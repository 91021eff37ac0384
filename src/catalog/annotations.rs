//! Notes and research bookmarks

use super::Catalog;
use crate::infrastructure::database::entities::{bookmark, note};
use crate::shared::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

impl Catalog {
    pub async fn add_note(
        &self,
        locid: Uuid,
        body: &str,
        actor: &str,
    ) -> CoreResult<note::Model> {
        if body.trim().is_empty() {
            return Err(CoreError::validation("note body must not be empty"));
        }
        self.get_location(locid).await?;
        let now = Utc::now();
        Ok(note::ActiveModel {
            note_id: Set(Uuid::new_v4()),
            locid: Set(locid),
            body: Set(body.to_string()),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await?)
    }

    pub async fn notes_of(&self, locid: Uuid) -> CoreResult<Vec<note::Model>> {
        Ok(note::Entity::find()
            .filter(note::Column::Locid.eq(locid))
            .order_by_desc(note::Column::CreatedAt)
            .all(self.conn())
            .await?)
    }

    pub async fn delete_note(&self, note_id: Uuid) -> CoreResult<()> {
        let result = note::Entity::delete_by_id(note_id).exec(self.conn()).await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("note", note_id));
        }
        Ok(())
    }

    pub async fn add_bookmark(
        &self,
        url: &str,
        title: Option<&str>,
        locid: Option<Uuid>,
        actor: &str,
    ) -> CoreResult<bookmark::Model> {
        if url.trim().is_empty() {
            return Err(CoreError::validation("bookmark url must not be empty"));
        }
        Ok(bookmark::ActiveModel {
            bookmark_id: Set(Uuid::new_v4()),
            url: Set(url.to_string()),
            title: Set(title.map(str::to_string)),
            locid: Set(locid),
            added_by: Set(actor.to_string()),
            added_at: Set(Utc::now()),
        }
        .insert(self.conn())
        .await?)
    }

    pub async fn bookmarks(&self, locid: Option<Uuid>) -> CoreResult<Vec<bookmark::Model>> {
        let mut query = bookmark::Entity::find().order_by_desc(bookmark::Column::AddedAt);
        if let Some(locid) = locid {
            query = query.filter(bookmark::Column::Locid.eq(locid));
        }
        Ok(query.all(self.conn()).await?)
    }

    pub async fn delete_bookmark(&self, bookmark_id: Uuid) -> CoreResult<()> {
        let result = bookmark::Entity::delete_by_id(bookmark_id)
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("bookmark", bookmark_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::Location;
    use crate::infrastructure::database::Database;

    #[tokio::test]
    async fn note_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        let catalog = Catalog::new(std::sync::Arc::new(db.conn().clone()));

        let loc = catalog
            .insert_location(Location::new("Site", "t"))
            .await
            .unwrap();

        let note = catalog.add_note(loc.locid, "gate on the east side", "t").await.unwrap();
        assert_eq!(catalog.notes_of(loc.locid).await.unwrap().len(), 1);
        assert!(catalog.add_note(loc.locid, "  ", "t").await.is_err());

        catalog.delete_note(note.note_id).await.unwrap();
        assert!(catalog.notes_of(loc.locid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bookmarks_filter_by_location() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        let catalog = Catalog::new(std::sync::Arc::new(db.conn().clone()));

        let loc = catalog
            .insert_location(Location::new("Site", "t"))
            .await
            .unwrap();
        catalog
            .add_bookmark("https://example.org/history", Some("county history"), Some(loc.locid), "t")
            .await
            .unwrap();
        catalog
            .add_bookmark("https://example.org/general", None, None, "t")
            .await
            .unwrap();

        assert_eq!(catalog.bookmarks(Some(loc.locid)).await.unwrap().len(), 1);
        assert_eq!(catalog.bookmarks(None).await.unwrap().len(), 2);
    }
}
