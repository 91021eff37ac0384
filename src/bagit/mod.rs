//! BagIt-style location seals (RFC 8493 compatible)
//!
//! Sealing a location writes a `bag-info.txt` and `manifest-sha256.txt`
//! under `R/.bags/<loc12>/`, freezing the expected inventory. Verification
//! reports one of four statuses: `none` (never sealed), `valid` (every file
//! present, every hash matching, oxum matching), `incomplete` (files
//! missing), `invalid` (hash or oxum drift).

use crate::catalog::Catalog;
use crate::content::hasher;
use crate::content::store::ContentStore;
use crate::shared::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BagStatus {
    None,
    Valid,
    Incomplete,
    Invalid,
}

#[derive(Debug, Clone, Serialize)]
pub struct BagReport {
    pub status: BagStatus,
    pub expected_files: usize,
    pub present_files: usize,
    pub hash_mismatches: usize,
}

#[derive(Clone)]
pub struct BagService {
    catalog: Catalog,
    store: ContentStore,
}

impl BagService {
    pub fn new(catalog: Catalog, store: ContentStore) -> Self {
        Self { catalog, store }
    }

    fn bag_dir(&self, loc12: &str) -> PathBuf {
        self.store.root().join(".bags").join(loc12)
    }

    /// Seal a location: freeze its current media inventory into a bag.
    pub async fn seal(&self, locid: Uuid) -> CoreResult<BagReport> {
        let location = self.catalog.get_location(locid).await?;
        let media = self.catalog.media_by_location(locid).await?;
        if media.is_empty() {
            return Err(CoreError::validation(
                "location has no media; nothing to seal",
            ));
        }

        let bag_dir = self.bag_dir(&location.loc12);
        tokio::fs::create_dir_all(&bag_dir)
            .await
            .map_err(|e| CoreError::io(&bag_dir, e))?;

        let mut manifest = String::new();
        let mut total_bytes: u64 = 0;
        for record in &media {
            let relative = Path::new(&record.archived_path)
                .strip_prefix(self.store.root())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| record.archived_path.clone());
            manifest.push_str(&format!("{}  {}\n", record.hash, relative));
            total_bytes += record.file_size_bytes.max(0) as u64;
        }

        let manifest_path = bag_dir.join("manifest-sha256.txt");
        tokio::fs::write(&manifest_path, &manifest)
            .await
            .map_err(|e| CoreError::io(&manifest_path, e))?;

        let info = format!(
            "Bag-Software-Agent: vestige-core\n\
             Bagging-Date: {}\n\
             External-Identifier: {}\n\
             Payload-Oxum: {}.{}\n",
            chrono::Utc::now().format("%Y-%m-%d"),
            location.loc12,
            total_bytes,
            media.len(),
        );
        let info_path = bag_dir.join("bag-info.txt");
        tokio::fs::write(&info_path, info)
            .await
            .map_err(|e| CoreError::io(&info_path, e))?;

        Ok(BagReport {
            status: BagStatus::Valid,
            expected_files: media.len(),
            present_files: media.len(),
            hash_mismatches: 0,
        })
    }

    /// Verify a sealed location against its frozen inventory.
    pub async fn verify(&self, locid: Uuid) -> CoreResult<BagReport> {
        let location = self.catalog.get_location(locid).await?;
        let bag_dir = self.bag_dir(&location.loc12);
        let manifest_path = bag_dir.join("manifest-sha256.txt");

        let manifest = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(manifest) => manifest,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BagReport {
                    status: BagStatus::None,
                    expected_files: 0,
                    present_files: 0,
                    hash_mismatches: 0,
                });
            }
            Err(e) => return Err(CoreError::io(&manifest_path, e)),
        };

        let expected_oxum = self.read_oxum(&bag_dir).await?;

        let mut expected_files = 0usize;
        let mut present_files = 0usize;
        let mut hash_mismatches = 0usize;
        let mut actual_bytes: u64 = 0;

        for line in manifest.lines().filter(|l| !l.trim().is_empty()) {
            let Some((sha, relative)) = line.split_once("  ") else {
                hash_mismatches += 1;
                continue;
            };
            expected_files += 1;
            let path = self.store.root().join(relative.trim());
            match hasher::hash_file(&path).await {
                Ok(output) => {
                    present_files += 1;
                    actual_bytes += output.bytes_read;
                    if output.sha256_hex != sha.trim() {
                        hash_mismatches += 1;
                    }
                }
                Err(_) => {}
            }
        }

        let status = if present_files < expected_files {
            BagStatus::Incomplete
        } else if hash_mismatches > 0 {
            BagStatus::Invalid
        } else if let Some((bytes, count)) = expected_oxum {
            if bytes == actual_bytes && count == expected_files as u64 {
                BagStatus::Valid
            } else {
                BagStatus::Invalid
            }
        } else {
            BagStatus::Valid
        };

        Ok(BagReport {
            status,
            expected_files,
            present_files,
            hash_mismatches,
        })
    }

    async fn read_oxum(&self, bag_dir: &Path) -> CoreResult<Option<(u64, u64)>> {
        let info_path = bag_dir.join("bag-info.txt");
        let info = match tokio::fs::read_to_string(&info_path).await {
            Ok(info) => info,
            Err(_) => return Ok(None),
        };
        for line in info.lines() {
            if let Some(value) = line.strip_prefix("Payload-Oxum:") {
                if let Some((bytes, count)) = value.trim().split_once('.') {
                    let bytes = bytes.parse().ok();
                    let count = count.parse().ok();
                    if let (Some(bytes), Some(count)) = (bytes, count) {
                        return Ok(Some((bytes, count)));
                    }
                }
            }
        }
        Ok(None)
    }
}
