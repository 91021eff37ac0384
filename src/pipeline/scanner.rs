//! Import step 1: enumerate and classify source files
//!
//! Recursively expands the requested paths, skipping hidden files and
//! well-known junk, classifying everything else by extension. Sidecars are
//! associated with their principal file by filename stem.

use crate::domain::media::{classify, MediaKind};
use crate::shared::error::{CoreError, CoreResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Junk that shows up on camera cards and network shares.
static SKIP_GLOBS: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in ["Thumbs.db", "desktop.ini", ".DS_Store", "*.tmp", "*.part"] {
        builder.add(Glob::new(pattern).expect("static glob"));
    }
    builder.build().expect("static globset")
});

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub stem: String,
    pub kind: MediaKind,
    /// For sidecars, the source path of the principal file they annotate.
    pub sidecar_of: Option<PathBuf>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Recursively expand the given paths into a classified, deterministic
/// (sorted) file list.
pub async fn scan(paths: &[PathBuf]) -> CoreResult<Vec<ScannedFile>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut stack: Vec<PathBuf> = paths.to_vec();

    while let Some(current) = stack.pop() {
        let metadata = tokio::fs::metadata(&current)
            .await
            .map_err(|e| CoreError::io(&current, e))?;

        if metadata.is_file() {
            if !is_hidden(&current)
                && !current
                    .file_name()
                    .map(|n| SKIP_GLOBS.is_match(Path::new(n)))
                    .unwrap_or(false)
            {
                files.push(current);
            }
            continue;
        }

        let mut dir = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| CoreError::io(&current, e))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CoreError::io(&current, e))?
        {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            stack.push(path);
        }
    }

    files.sort();

    // Index principals by stem so sidecars can attach to them.
    let mut principal_by_stem: HashMap<String, PathBuf> = HashMap::new();
    for file in &files {
        let kind = classify(file);
        if kind.is_archivable() {
            principal_by_stem
                .entry(stem_of(file))
                .or_insert_with(|| file.clone());
        }
    }

    Ok(files
        .into_iter()
        .map(|path| {
            let kind = classify(&path);
            let stem = stem_of(&path);
            let sidecar_of = if kind == MediaKind::Sidecar {
                principal_by_stem.get(&stem).cloned()
            } else {
                None
            };
            ScannedFile {
                path,
                stem,
                kind,
                sidecar_of,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, b"x").await.unwrap();
    }

    #[tokio::test]
    async fn scans_recursively_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.jpg")).await;
        touch(&dir.path().join("sub/b.mov")).await;
        touch(&dir.path().join("sub/deep/c.pdf")).await;
        touch(&dir.path().join(".hidden.jpg")).await;
        touch(&dir.path().join("Thumbs.db")).await;

        let scanned = scan(&[dir.path().to_path_buf()]).await.unwrap();
        let kinds: Vec<MediaKind> = scanned.iter().map(|f| f.kind).collect();
        assert_eq!(scanned.len(), 3);
        assert!(kinds.contains(&MediaKind::Image));
        assert!(kinds.contains(&MediaKind::Video));
        assert!(kinds.contains(&MediaKind::Document));
    }

    #[tokio::test]
    async fn sidecar_attaches_to_principal() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("shot.nef")).await;
        touch(&dir.path().join("shot.xmp")).await;
        touch(&dir.path().join("orphan.xmp")).await;

        let scanned = scan(&[dir.path().to_path_buf()]).await.unwrap();
        let sidecar = scanned
            .iter()
            .find(|f| f.path.file_name().unwrap() == "shot.xmp")
            .unwrap();
        assert_eq!(
            sidecar.sidecar_of.as_ref().unwrap().file_name().unwrap(),
            "shot.nef"
        );

        let orphan = scanned
            .iter()
            .find(|f| f.path.file_name().unwrap() == "orphan.xmp")
            .unwrap();
        assert!(orphan.sidecar_of.is_none());
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let err = scan(&[PathBuf::from("/definitely/not/here")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::shared::error::ErrorKind::Io);
    }
}
