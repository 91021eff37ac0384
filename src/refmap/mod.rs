//! Reference map ingestion
//!
//! Parses point files researchers trade around (KML/KMZ exports, GPX tracks,
//! GeoJSON layers, CSV dumps) into candidate points for cataloging.

pub mod parser;

pub use parser::{parse_file, ParsedPoint};
