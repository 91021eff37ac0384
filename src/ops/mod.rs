//! Public API operations consumed by the UI shell and the CLI
//!
//! Grouped by subject as `impl Archive` blocks. Every operation returns a
//! typed payload or a `CoreError`; fixity operations live directly on
//! `Archive::fixity`.

pub mod derivatives;
pub mod health;
pub mod jobs;
pub mod locations;
pub mod media;
pub mod processing;
pub mod reference_maps;
