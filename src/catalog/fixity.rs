//! Fixity record repository

use super::media::MediaRecord;
use super::Catalog;
use crate::domain::fixity::{FixityRecord, FixityStatus};
use crate::domain::media::MediaKind;
use crate::infrastructure::database::entities::fixity_record;
use crate::shared::error::CoreResult;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use std::str::FromStr;

impl Catalog {
    /// Append one verification record. Records are immutable; there is no
    /// update path.
    pub async fn insert_fixity_record(&self, record: &FixityRecord) -> CoreResult<()> {
        fixity_record::ActiveModel {
            check_id: Set(record.check_id),
            media_sha: Set(record.media_sha.clone()),
            media_type: Set(record.media_type.to_string()),
            file_path: Set(record.file_path.clone()),
            checked_at: Set(record.checked_at),
            checked_by: Set(record.checked_by.clone()),
            expected_hash: Set(record.expected_hash.clone()),
            actual_hash: Set(record.actual_hash.clone()),
            status: Set(record.status.to_string()),
            actual_size: Set(record.actual_size.map(|s| s as i64)),
            error_message: Set(record.error_message.clone()),
        }
        .insert(self.conn())
        .await?;
        Ok(())
    }

    pub async fn fixity_history(&self, sha: &str) -> CoreResult<Vec<FixityRecord>> {
        let rows = fixity_record::Entity::find()
            .filter(fixity_record::Column::MediaSha.eq(sha))
            .order_by_desc(fixity_record::Column::CheckedAt)
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().map(from_model).collect())
    }

    /// Latest check per hash, for `not_verified_since` scoping.
    pub async fn last_checked_map(&self) -> CoreResult<HashMap<String, DateTime<Utc>>> {
        let rows = fixity_record::Entity::find()
            .order_by_desc(fixity_record::Column::CheckedAt)
            .all(self.conn())
            .await?;
        let mut map = HashMap::new();
        for row in rows {
            map.entry(row.media_sha).or_insert(row.checked_at);
        }
        Ok(map)
    }

    /// Uniform sample of media rows for a spot check.
    pub async fn sample_media(&self, n: usize) -> CoreResult<Vec<MediaRecord>> {
        let mut all = self.all_media().await?;
        let mut rng = rand::thread_rng();
        all.shuffle(&mut rng);
        all.truncate(n);
        Ok(all)
    }
}

fn from_model(m: fixity_record::Model) -> FixityRecord {
    FixityRecord {
        check_id: m.check_id,
        media_sha: m.media_sha,
        media_type: MediaKind::from_str(&m.media_type).unwrap_or(MediaKind::Image),
        file_path: m.file_path,
        checked_at: m.checked_at,
        checked_by: m.checked_by,
        expected_hash: m.expected_hash,
        actual_hash: m.actual_hash,
        status: FixityStatus::from_str(&m.status).unwrap_or(FixityStatus::Error),
        actual_size: m.actual_size.map(|s| s as u64),
        error_message: m.error_message,
    }
}
