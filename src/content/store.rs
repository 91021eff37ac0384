//! Hash-bucketed blob store
//!
//! Only this component writes under the archive root. Placement is atomic:
//! partially written blobs are staged as dot-temp files and renamed into
//! place, so readers never observe a torn blob.

use super::hasher;
use crate::domain::media::MediaKind;
use crate::shared::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Thumbnail tier, fixed at two sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbTier {
    /// max edge 400 px
    Small,
    /// max edge 800 px
    Large,
}

impl ThumbTier {
    pub fn suffix(&self) -> &'static str {
        match self {
            ThumbTier::Small => "sm",
            ThumbTier::Large => "lg",
        }
    }

    pub fn max_edge(&self) -> u32 {
        match self {
            ThumbTier::Small => 400,
            ThumbTier::Large => 800,
        }
    }
}

/// How a blob ended up in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    Hardlink,
    Reflink,
    Copy,
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct PlacedBlob {
    pub path: PathBuf,
    pub bytes: u64,
    pub method: PlacementMethod,
}

#[derive(Debug, Clone)]
pub struct BlobStat {
    pub size: u64,
    pub mtime: Option<chrono::DateTime<chrono::Utc>>,
}

/// The content-addressed store rooted at the archive directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket(sha: &str) -> &str {
        &sha[0..2]
    }

    /// Deterministic primary-blob path. Pure; does not touch disk.
    pub fn path_of(&self, sha: &str, kind: MediaKind, ext: &str) -> PathBuf {
        self.root
            .join(kind.dir_segment())
            .join(Self::bucket(sha))
            .join(format!("{sha}.{ext}"))
    }

    pub fn thumb_path(&self, sha: &str, tier: ThumbTier) -> PathBuf {
        self.root
            .join(".thumbs")
            .join(Self::bucket(sha))
            .join(format!("{sha}_{}.jpg", tier.suffix()))
    }

    pub fn preview_path(&self, sha: &str) -> PathBuf {
        self.root
            .join(".previews")
            .join(Self::bucket(sha))
            .join(format!("{sha}.jpg"))
    }

    pub fn proxy_path(&self, sha: &str) -> PathBuf {
        self.root
            .join(".proxies")
            .join(Self::bucket(sha))
            .join(format!("{sha}.mp4"))
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.root.join(".manifests")
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.root.join(".catalog")
    }

    /// Whether a path under the root follows the `<kind>/<h[0..2]>/<h>.<ext>`
    /// scheme. Foreign files under the archive root are ignored.
    pub fn is_archive_path(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let parts: Vec<&str> = rel.iter().filter_map(|p| p.to_str()).collect();
        if parts.len() != 3 {
            return false;
        }
        let stem = match Path::new(parts[2]).file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => return false,
        };
        hasher::is_sha256_hex(stem) && parts[1] == Self::bucket(stem)
    }

    /// Find an existing blob for a hash, checking every kind directory.
    pub async fn find(&self, sha: &str) -> Option<PathBuf> {
        for kind in [
            MediaKind::Image,
            MediaKind::Video,
            MediaKind::Document,
            MediaKind::Map,
        ] {
            let bucket_dir = self.root.join(kind.dir_segment()).join(Self::bucket(sha));
            let mut entries = match tokio::fs::read_dir(&bucket_dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            let prefix = format!("{sha}.");
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.file_name().to_string_lossy().starts_with(&prefix) {
                    return Some(entry.path());
                }
            }
        }
        None
    }

    pub async fn exists(&self, sha: &str) -> bool {
        self.find(sha).await.is_some()
    }

    pub async fn stat(&self, path: &Path) -> CoreResult<BlobStat> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        let mtime = metadata
            .modified()
            .ok()
            .map(chrono::DateTime::<chrono::Utc>::from);
        Ok(BlobStat {
            size: metadata.len(),
            mtime,
        })
    }

    pub async fn read_stream(&self, path: &Path) -> CoreResult<tokio::fs::File> {
        tokio::fs::File::open(path)
            .await
            .map_err(|e| CoreError::io(path, e))
    }

    /// Place a file into the archive under its hash.
    ///
    /// Idempotent: if the blob already exists the placement is a no-op.
    /// Strategy ladder: hardlink (when allowed and same device), reflink,
    /// then streamed copy to a temp file + fsync + atomic rename.
    pub async fn place(
        &self,
        source: &Path,
        sha: &str,
        kind: MediaKind,
        ext: &str,
        allow_hardlink: bool,
    ) -> CoreResult<PlacedBlob> {
        let dest = self.path_of(sha, kind, ext);

        if let Ok(metadata) = tokio::fs::metadata(&dest).await {
            debug!(sha, "blob already present, placement is a no-op");
            return Ok(PlacedBlob {
                path: dest,
                bytes: metadata.len(),
                method: PlacementMethod::AlreadyPresent,
            });
        }

        let source_meta = tokio::fs::metadata(source)
            .await
            .map_err(|e| CoreError::io(source, e))?;
        let source_len = source_meta.len();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }

        if allow_hardlink {
            match tokio::fs::hard_link(source, &dest).await {
                Ok(()) => {
                    debug!(sha, "placed via hardlink");
                    return Ok(PlacedBlob {
                        path: dest,
                        bytes: source_len,
                        method: PlacementMethod::Hardlink,
                    });
                }
                Err(e) => {
                    debug!(sha, error = %e, "hardlink unavailable, falling back");
                }
            }
        }

        if let Some(placed) = self.try_reflink(source, &dest, source_len).await {
            return Ok(placed);
        }

        self.copy_atomic(source, &dest, sha, source_len).await
    }

    #[cfg(target_os = "linux")]
    async fn try_reflink(&self, source: &Path, dest: &Path, len: u64) -> Option<PlacedBlob> {
        use std::os::fd::AsRawFd;

        let source = source.to_path_buf();
        let dest_path = dest.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let src = std::fs::File::open(&source).ok()?;
            let dst = std::fs::File::create(&dest_path).ok()?;
            // FICLONE: clone the whole source into dest on CoW filesystems.
            let rc = unsafe { libc::ioctl(dst.as_raw_fd(), 0x4004_9409, src.as_raw_fd()) };
            if rc == 0 {
                Some(())
            } else {
                let _ = std::fs::remove_file(&dest_path);
                None
            }
        })
        .await
        .ok()
        .flatten()?;
        debug!("placed via reflink");
        Some(PlacedBlob {
            path: dest.to_path_buf(),
            bytes: len,
            method: PlacementMethod::Reflink,
        })
    }

    #[cfg(not(target_os = "linux"))]
    async fn try_reflink(&self, _source: &Path, _dest: &Path, _len: u64) -> Option<PlacedBlob> {
        None
    }

    /// Streamed copy into a dot-temp sibling, fsync, then atomic rename.
    /// Never copies directly to the final path.
    async fn copy_atomic(
        &self,
        source: &Path,
        dest: &Path,
        sha: &str,
        expected_len: u64,
    ) -> CoreResult<PlacedBlob> {
        let tmp = dest.with_file_name(format!(
            ".tmp-{}-{}",
            uuid::Uuid::new_v4().simple(),
            dest.file_name().and_then(|n| n.to_str()).unwrap_or("blob")
        ));

        let result = self.copy_into_tmp(source, &tmp, expected_len).await;
        let copied = match result {
            Ok(copied) => copied,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        if copied != expected_len {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::integrity(
                sha,
                format!("source changed size mid-copy ({expected_len} expected, {copied} copied)"),
            ));
        }

        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::io(dest, e));
        }

        debug!(sha, bytes = copied, "placed via atomic copy");
        Ok(PlacedBlob {
            path: dest.to_path_buf(),
            bytes: copied,
            method: PlacementMethod::Copy,
        })
    }

    async fn copy_into_tmp(&self, source: &Path, tmp: &Path, _len: u64) -> CoreResult<u64> {
        let mut src = tokio::fs::File::open(source)
            .await
            .map_err(|e| CoreError::io(source, e))?;
        let mut dst = tokio::fs::File::create(tmp)
            .await
            .map_err(|e| CoreError::io(tmp, e))?;

        let copied = tokio::io::copy(&mut src, &mut dst)
            .await
            .map_err(|e| CoreError::io(tmp, e))?;

        dst.flush().await.map_err(|e| CoreError::io(tmp, e))?;
        dst.sync_all().await.map_err(|e| CoreError::io(tmp, e))?;
        Ok(copied)
    }

    /// Write bytes as a derivative (thumbnail/preview/poster) atomically.
    /// Regeneration is always safe: the rename overwrites in one step.
    pub async fn write_derivative(&self, dest: &Path, bytes: &[u8]) -> CoreResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }
        let tmp = dest.with_file_name(format!(
            ".tmp-{}-{}",
            uuid::Uuid::new_v4().simple(),
            dest.file_name().and_then(|n| n.to_str()).unwrap_or("deriv")
        ));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| CoreError::io(&tmp, e))?;
        if let Err(e) = file.write_all(bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::io(&tmp, e));
        }
        if let Err(e) = file.sync_all().await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::io(&tmp, e));
        }
        drop(file);
        tokio::fs::rename(&tmp, dest)
            .await
            .map_err(|e| CoreError::io(dest, e))
    }

    /// Delete a blob and all of its derivatives.
    pub async fn delete(&self, sha: &str) -> CoreResult<()> {
        if let Some(path) = self.find(sha).await {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| CoreError::io(&path, e))?;
        } else {
            warn!(sha, "delete requested for absent blob");
        }
        for derivative in [
            self.thumb_path(sha, ThumbTier::Small),
            self.thumb_path(sha, ThumbTier::Large),
            self.preview_path(sha),
            self.proxy_path(sha),
        ] {
            match tokio::fs::remove_file(&derivative).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CoreError::io(&derivative, e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::hasher::hash_file;

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn path_layout() {
        let store = ContentStore::new("/archive");
        let sha = "ab".repeat(32);
        assert_eq!(
            store.path_of(&sha, MediaKind::Image, "jpg"),
            PathBuf::from(format!("/archive/images/ab/{sha}.jpg"))
        );
        assert_eq!(
            store.thumb_path(&sha, ThumbTier::Small),
            PathBuf::from(format!("/archive/.thumbs/ab/{sha}_sm.jpg"))
        );
        assert_eq!(
            store.proxy_path(&sha),
            PathBuf::from(format!("/archive/.proxies/ab/{sha}.mp4"))
        );
    }

    #[tokio::test]
    async fn place_and_rehash_roundtrip() {
        let (dir, store) = store();
        let source = dir.path().join("src.jpg");
        tokio::fs::write(&source, b"image bytes").await.unwrap();
        let sha = hash_file(&source).await.unwrap().sha256_hex;

        let placed = store
            .place(&source, &sha, MediaKind::Image, "jpg", false)
            .await
            .unwrap();
        assert_eq!(placed.method, PlacementMethod::Copy);
        assert!(placed.path.exists());

        // Rehash-identity law
        let rehashed = hash_file(&placed.path).await.unwrap().sha256_hex;
        assert_eq!(rehashed, sha);
    }

    #[tokio::test]
    async fn place_is_idempotent() {
        let (dir, store) = store();
        let source = dir.path().join("src.jpg");
        tokio::fs::write(&source, b"image bytes").await.unwrap();
        let sha = hash_file(&source).await.unwrap().sha256_hex;

        store
            .place(&source, &sha, MediaKind::Image, "jpg", false)
            .await
            .unwrap();
        let second = store
            .place(&source, &sha, MediaKind::Image, "jpg", false)
            .await
            .unwrap();
        assert_eq!(second.method, PlacementMethod::AlreadyPresent);
    }

    #[tokio::test]
    async fn hardlink_used_when_allowed() {
        let (dir, store) = store();
        let source = dir.path().join("src.jpg");
        tokio::fs::write(&source, b"image bytes").await.unwrap();
        let sha = hash_file(&source).await.unwrap().sha256_hex;

        // tempdir and archive root share a device here
        let placed = store
            .place(&source, &sha, MediaKind::Image, "jpg", true)
            .await
            .unwrap();
        assert_eq!(placed.method, PlacementMethod::Hardlink);
    }

    #[tokio::test]
    async fn exists_and_delete() {
        let (dir, store) = store();
        let source = dir.path().join("src.jpg");
        tokio::fs::write(&source, b"image bytes").await.unwrap();
        let sha = hash_file(&source).await.unwrap().sha256_hex;

        assert!(!store.exists(&sha).await);
        store
            .place(&source, &sha, MediaKind::Image, "jpg", false)
            .await
            .unwrap();
        assert!(store.exists(&sha).await);

        store.delete(&sha).await.unwrap();
        assert!(!store.exists(&sha).await);
    }

    #[tokio::test]
    async fn no_partial_blob_on_missing_source() {
        let (dir, store) = store();
        let sha = "cd".repeat(32);
        let missing = dir.path().join("nope.jpg");
        let err = store
            .place(&missing, &sha, MediaKind::Image, "jpg", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::shared::error::ErrorKind::Io);
        assert!(!store.path_of(&sha, MediaKind::Image, "jpg").exists());
    }

    #[test]
    fn foreign_paths_ignored() {
        let store = ContentStore::new("/archive");
        let sha = "ab".repeat(32);
        assert!(store.is_archive_path(Path::new(&format!("/archive/images/ab/{sha}.jpg"))));
        // wrong bucket
        assert!(!store.is_archive_path(Path::new(&format!("/archive/images/cd/{sha}.jpg"))));
        // not a hash stem
        assert!(!store.is_archive_path(Path::new("/archive/images/ab/readme.txt")));
        // outside the root
        assert!(!store.is_archive_path(Path::new("/elsewhere/images/ab/x.jpg")));
    }
}
