//! Content-addressed storage
//!
//! Blobs are keyed by SHA-256 and live under two-character hex buckets so no
//! directory grows past ~65k entries at realistic archive scales.

pub mod hasher;
pub mod store;

pub use hasher::{hash_file, quick_fingerprint, HashOutput};
pub use store::{ContentStore, PlacedBlob, PlacementMethod};
