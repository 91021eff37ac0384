//! Health and maintenance operations

use crate::shared::error::{CoreError, CoreResult};
use crate::Archive;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub locations: u64,
    pub images: u64,
    pub videos: u64,
    pub documents: u64,
    pub reference_maps: usize,
    pub reference_points: usize,
    pub queue_pending: u64,
    pub dead_letters: usize,
    pub last_fixity: Option<crate::domain::fixity::FixityReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskSpace {
    pub archive_path: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub media_rows: usize,
    pub missing_blobs: Vec<String>,
    /// Files under the archive root that do not follow the bucket scheme.
    /// They are ignored by the store, listed here for the operator.
    pub foreign_files: Vec<String>,
}

impl Archive {
    pub async fn dashboard(&self) -> CoreResult<Dashboard> {
        let (images, videos, documents) = self.catalog.media_counts().await?;
        let maps = self.catalog.list_reference_maps().await?;
        let points = self.catalog.all_ref_points().await?;
        let queue_status = self.job_status().await?;
        let dead = self.dead_letters(None).await?;
        Ok(Dashboard {
            locations: self.catalog.count_locations().await?,
            images,
            videos,
            documents,
            reference_maps: maps.len(),
            reference_points: points.len(),
            queue_pending: queue_status.iter().map(|q| q.pending).sum(),
            dead_letters: dead.len(),
            last_fixity: self.fixity.last_result().await,
        })
    }

    pub async fn disk_space(&self) -> CoreResult<DiskSpace> {
        let path = self.config.archive_path.clone();
        let space = tokio::task::spawn_blocking(move || statvfs(&path))
            .await
            .map_err(|e| CoreError::internal(format!("disk probe join: {e}")))??;
        Ok(space)
    }

    /// Cross-check every media row against the blob on disk, and list
    /// foreign files squatting under the archive root.
    pub async fn integrity_check(&self) -> CoreResult<IntegrityReport> {
        let media = self.catalog.all_media().await?;
        let mut report = IntegrityReport {
            media_rows: media.len(),
            ..Default::default()
        };

        for record in &media {
            if tokio::fs::metadata(&record.archived_path).await.is_err() {
                warn!(sha = %record.hash, "media row points at a missing blob");
                report.missing_blobs.push(record.archived_path.clone());
            }
        }

        for kind_dir in ["images", "videos", "documents", "maps"] {
            let dir = self.store.root().join(kind_dir);
            let mut stack = vec![dir];
            while let Some(current) = stack.pop() {
                let mut entries = match tokio::fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(_) => continue,
                };
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let path = entry.path();
                    if path.is_dir() {
                        stack.push(path);
                    } else if !self.store.is_archive_path(&path) {
                        report.foreign_files.push(path.to_string_lossy().into_owned());
                    }
                }
            }
        }

        Ok(report)
    }
}

#[cfg(unix)]
fn statvfs(path: &Path) -> CoreResult<DiskSpace> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| CoreError::validation("archive path contains NUL"))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(CoreError::io(path, std::io::Error::last_os_error()));
    }
    Ok(DiskSpace {
        archive_path: path.to_string_lossy().into_owned(),
        total_bytes: stat.f_blocks as u64 * stat.f_frsize as u64,
        available_bytes: stat.f_bavail as u64 * stat.f_frsize as u64,
    })
}

#[cfg(not(unix))]
fn statvfs(path: &Path) -> CoreResult<DiskSpace> {
    Ok(DiskSpace {
        archive_path: path.to_string_lossy().into_owned(),
        total_bytes: 0,
        available_bytes: 0,
    })
}
