//! Catalog database using SeaORM
//!
//! One embedded SQLite file under the archive root (WAL journal). Writers are
//! serialized by SQLite; readers see MVCC snapshots. Migrations run on open.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, RuntimeErr, SqlxSqliteConnector, Statement};
use sea_orm_migration::MigratorTrait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

pub struct Database {
    conn: DatabaseConnection,
    path: PathBuf,
}

impl Database {
    /// Open the catalog, creating the file and applying migrations as needed.
    pub async fn open_or_create(path: &Path) -> Result<Self, DbErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Failed to create catalog directory: {e}")))?;
        }

        // Pragmas go on the connect options so every connection the pool
        // opens gets them; foreign_keys in particular is per-connection.
        // WAL keeps readers unblocked while the single writer commits.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-20000")
            .pragma("mmap_size", "67108864");

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(8))
            .connect_with(options)
            .await
            .map_err(|e| DbErr::Conn(RuntimeErr::SqlxError(e)))?;

        let conn = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

        info!("Opened catalog at {:?}", path);

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Apply pending migrations. Takes an exclusive lock for the duration.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Catalog migrations up to date");
        Ok(())
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamped full-file copy into `backups/` next to the catalog.
    /// Returns the backup path.
    pub async fn backup(&self) -> Result<PathBuf, DbErr> {
        let backups = self
            .path
            .parent()
            .map(|p| p.join("backups"))
            .ok_or_else(|| DbErr::Custom("catalog path has no parent".into()))?;
        tokio::fs::create_dir_all(&backups)
            .await
            .map_err(|e| DbErr::Custom(format!("Failed to create backups dir: {e}")))?;

        // Flush the WAL so the copied file is self-contained.
        self.conn
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "PRAGMA wal_checkpoint(TRUNCATE)",
            ))
            .await?;

        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive.db".to_string());
        let dest = backups.join(format!("{stamp}-{file_name}"));

        tokio::fs::copy(&self.path, &dest)
            .await
            .map_err(|e| DbErr::Custom(format!("Backup copy failed: {e}")))?;

        info!("Catalog backed up to {:?}", dest);
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_migrate_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(".catalog/archive.db");
        let db = Database::open_or_create(&db_path).await.unwrap();
        db.migrate().await.unwrap();

        // Idempotent: a second run is a no-op.
        db.migrate().await.unwrap();

        let backup = db.backup().await.unwrap();
        assert!(backup.exists());
        assert!(backup.parent().unwrap().ends_with("backups"));
    }

    #[tokio::test]
    async fn foreign_keys_enforced_on_pooled_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_or_create(&dir.path().join("archive.db"))
            .await
            .unwrap();

        // The pragma must hold on whatever connection the pool hands out,
        // not just the first one.
        for _ in 0..20 {
            let row = db
                .conn()
                .query_one(Statement::from_string(
                    sea_orm::DatabaseBackend::Sqlite,
                    "PRAGMA foreign_keys",
                ))
                .await
                .unwrap()
                .expect("pragma returns a row");
            let enabled: i32 = row.try_get_by_index(0).unwrap();
            assert_eq!(enabled, 1);
        }
    }
}
