//! Catalog access layer
//!
//! Typed repositories over the database entities. Write-side rules live
//! here: region derivation, address normalization, validation, multi-table
//! transactions, and the weak hero-image reference.

pub mod annotations;
pub mod fixity;
pub mod imports;
pub mod locations;
pub mod media;
pub mod refmaps;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared handle over the catalog connection.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<DatabaseConnection>,
}

impl Catalog {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn conn_arc(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }
}
