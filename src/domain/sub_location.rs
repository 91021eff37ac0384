//! SubLocation - a building within a campus

use crate::shared::error::{CoreError, CoreResult};
use crate::shared::types::short_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubLocation {
    pub subid: Uuid,
    pub sub12: String,
    /// Parent location
    pub locid: Uuid,
    pub subnam: String,
    pub ssubname: Option<String>,
    pub sub_type: Option<String>,
    pub status: Option<String>,
    pub hero_imgsha: Option<String>,
    /// At most one primary per parent location, enforced by the catalog.
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubLocation {
    pub fn new(locid: Uuid, name: impl Into<String>) -> Self {
        let subid = Uuid::new_v4();
        let now = Utc::now();
        Self {
            subid,
            sub12: short_id(subid),
            locid,
            subnam: name.into(),
            ssubname: None,
            sub_type: None,
            status: None,
            hero_imgsha: None,
            is_primary: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.subnam.trim().is_empty() {
            return Err(CoreError::validation("sub-location name must not be empty"));
        }
        Ok(())
    }
}
