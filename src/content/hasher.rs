//! Streaming file hashing
//!
//! SHA-256 is the canonical content identity. The BLAKE3 fingerprint is a
//! cheap pre-duplicate heuristic only and never stands in for the identity.

use crate::shared::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming reads. Large enough to amortize syscalls, small
/// enough to yield frequently on big files.
const CHUNK_SIZE: usize = 256 * 1024;

/// Bytes of the file head covered by the quick fingerprint.
const FINGERPRINT_HEAD: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutput {
    pub sha256_hex: String,
    pub bytes_read: u64,
}

/// Stream-hash a file with SHA-256. Never loads the whole file.
pub async fn hash_file(path: &Path) -> CoreResult<HashOutput> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut bytes_read = 0u64;

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        bytes_read += n as u64;
        // Chunk boundary is a suspension point; keeps the pipeline cancellable.
        tokio::task::yield_now().await;
    }

    Ok(HashOutput {
        sha256_hex: hex::encode(hasher.finalize()),
        bytes_read,
    })
}

/// Cheap fingerprint: BLAKE3 of the first 1 MiB plus the file length.
///
/// Collisions here only cost an extra full hash; equality must always be
/// confirmed by SHA-256.
pub async fn quick_fingerprint(path: &Path) -> CoreResult<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(&metadata.len().to_le_bytes());

    let mut remaining = FINGERPRINT_HEAD.min(metadata.len());
    let mut buffer = vec![0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = file
            .read(&mut buffer[..want])
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        remaining -= n as u64;
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Equal SHA-256 with different sizes is impossible for intact files; treat
/// it as storage corruption or truncation, never as a collision.
pub fn check_size_consistency(
    sha: &str,
    size_a: u64,
    size_b: u64,
) -> CoreResult<()> {
    if size_a != size_b {
        return Err(CoreError::integrity(
            sha,
            format!("equal hash with differing sizes ({size_a} vs {size_b}); truncation or corruption"),
        ));
    }
    Ok(())
}

/// Validate a string as a lowercase SHA-256 hex digest.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let out = hash_file(&path).await.unwrap();
        assert_eq!(
            out.sha256_hex,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(out.bytes_read, 11);
    }

    #[tokio::test]
    async fn empty_file_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        tokio::fs::write(&path, b"").await.unwrap();

        let out = hash_file(&path).await.unwrap();
        assert_eq!(
            out.sha256_hex,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(out.bytes_read, 0);
    }

    #[tokio::test]
    async fn fingerprint_distinguishes_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        tokio::fs::write(&a, b"same head").await.unwrap();
        tokio::fs::write(&b, b"same head plus tail").await.unwrap();

        let fa = quick_fingerprint(&a).await.unwrap();
        let fb = quick_fingerprint(&b).await.unwrap();
        assert_ne!(fa, fb);
    }

    #[test]
    fn size_mismatch_is_integrity_error() {
        let err = check_size_consistency("ab".repeat(32).as_str(), 100, 99).unwrap_err();
        assert_eq!(err.kind(), crate::shared::error::ErrorKind::Integrity);
        assert!(check_size_consistency("ab", 5, 5).is_ok());
    }

    #[test]
    fn sha_hex_validation() {
        assert!(is_sha256_hex(&"a1".repeat(32)));
        assert!(!is_sha256_hex("xyz"));
        assert!(!is_sha256_hex(&"A1".repeat(32))); // uppercase rejected
    }
}
