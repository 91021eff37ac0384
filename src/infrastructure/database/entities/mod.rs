//! SeaORM entities, one per catalog table

pub mod bookmark;
pub mod dead_letter;
pub mod document;
pub mod duplicate_exclusion;
pub mod fixity_record;
pub mod image;
pub mod import;
pub mod job;
pub mod location;
pub mod note;
pub mod planned_file;
pub mod ref_map_point;
pub mod reference_map;
pub mod sub_location;
pub mod video;
