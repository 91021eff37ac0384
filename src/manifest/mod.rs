//! Append-only import manifests
//!
//! One JSON-lines file per session under `R/.manifests/`, recording every
//! file's source path, hash, target path, status and size. Used for
//! disaster-recovery audits; never rewritten.

use crate::shared::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source_path: String,
    pub sha256: Option<String>,
    pub target_path: Option<String>,
    pub status: String,
    pub size_bytes: Option<u64>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct ManifestWriter {
    dir: PathBuf,
}

impl ManifestWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, import_id: Uuid) -> PathBuf {
        self.dir.join(format!("{import_id}.json"))
    }

    /// Append one entry. Each line is fsynced so a crash loses at most the
    /// line being written.
    pub async fn append(&self, import_id: Uuid, entry: &ManifestEntry) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::io(&self.dir, e))?;
        let path = self.path_for(import_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| CoreError::io(&path, e))?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        file.write_all(&line)
            .await
            .map_err(|e| CoreError::io(&path, e))?;
        file.sync_data().await.map_err(|e| CoreError::io(&path, e))?;
        Ok(())
    }

    pub async fn read_all(&self, import_id: Uuid) -> CoreResult<Vec<ManifestEntry>> {
        let path = self.path_for(import_id);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CoreError::io(&path, e))?;
        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ManifestWriter::new(dir.path().join(".manifests"));
        let import_id = Uuid::new_v4();

        for i in 0..3 {
            writer
                .append(
                    import_id,
                    &ManifestEntry {
                        source_path: format!("/src/{i}.jpg"),
                        sha256: Some("ab".repeat(32)),
                        target_path: Some(format!("/archive/images/ab/{i}.jpg")),
                        status: "imported".into(),
                        size_bytes: Some(1024),
                        recorded_at: chrono::Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let entries = writer.read_all(import_id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].source_path, "/src/2.jpg");
    }
}
