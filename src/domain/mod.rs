//! Domain types for the archive
//!
//! Plain data types shared across the pipeline, catalog and API layers.
//! Persistence lives in `infrastructure::database::entities`.

pub mod address;
pub mod fixity;
pub mod import;
pub mod location;
pub mod media;
pub mod reference_map;
pub mod regions;
pub mod sub_location;

pub use fixity::{FixityRecord, FixityStatus};
pub use import::{FileOutcome, ImportOptions, ImportState, PlannedFileState};
pub use location::{Address, AddressConfidence, Gps, GpsSource, Location};
pub use media::{MediaKind, PreviewQuality};
pub use reference_map::{ReferenceMap, ReferenceMapPoint};
pub use sub_location::SubLocation;
