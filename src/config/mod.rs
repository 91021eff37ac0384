//! Archive configuration
//!
//! Sources, highest priority first: `ARCHIVE_*` environment variables, a
//! JSON config file (explicit path, then the working directory, then the
//! platform config dir), then built-in defaults. The file carries a schema
//! version with additive migrations.

mod migration;

pub use migration::Migrate;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "vestige.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDefaults {
    pub delete_originals: bool,
    pub use_hardlinks: bool,
    pub verify_checksums: bool,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            delete_originals: false,
            use_hardlinks: false,
            verify_checksums: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixityConfig {
    pub interval_days: u32,
    pub on_startup: bool,
}

impl Default for FixityConfig {
    fn default() -> Self {
        Self {
            interval_days: 30,
            on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Config schema version
    pub version: u32,

    /// Filesystem root of the archive
    pub archive_path: PathBuf,

    /// Catalog database path; defaults to `<archive_path>/.catalog/archive.db`
    pub catalog_path: Option<PathBuf>,

    pub import: ImportDefaults,
    pub fixity: FixityConfig,

    pub log_level: String,
}

impl ArchiveConfig {
    /// Resolve configuration from every source.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::find_config_file(explicit_path) {
            Some(path) => {
                info!("Loading config from {:?}", path);
                let json = fs::read_to_string(&path)?;
                let mut config: ArchiveConfig = serde_json::from_str(&json)?;
                if config.version < Self::target_version() {
                    info!(
                        "Migrating config from v{} to v{}",
                        config.version,
                        Self::target_version()
                    );
                    config.migrate()?;
                    config.save_to(&path)?;
                }
                config
            }
            None => {
                warn!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        if config.archive_path.as_os_str().is_empty() {
            return Err(anyhow!(
                "archive_path is required (set ARCHIVE_PATH or provide a config file)"
            ));
        }
        Ok(config)
    }

    fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return path.exists().then(|| path.to_path_buf());
        }
        if let Ok(env_path) = std::env::var("ARCHIVE_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Some(path);
            }
        }
        let cwd = PathBuf::from(CONFIG_FILE_NAME);
        if cwd.exists() {
            return Some(cwd);
        }
        let platform = dirs::config_dir()?.join("vestige").join(CONFIG_FILE_NAME);
        platform.exists().then_some(platform)
    }

    /// Environment overrides, highest priority.
    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("ARCHIVE_PATH") {
            self.archive_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("ARCHIVE_CATALOG_PATH") {
            self.catalog_path = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var("ARCHIVE_IMPORT_DELETE_ORIGINALS") {
            self.import.delete_originals = parse_bool(&value, self.import.delete_originals);
        }
        if let Ok(value) = std::env::var("ARCHIVE_IMPORT_USE_HARDLINKS") {
            self.import.use_hardlinks = parse_bool(&value, self.import.use_hardlinks);
        }
        if let Ok(value) = std::env::var("ARCHIVE_IMPORT_VERIFY_CHECKSUMS") {
            self.import.verify_checksums = parse_bool(&value, self.import.verify_checksums);
        }
        if let Ok(value) = std::env::var("ARCHIVE_FIXITY_INTERVAL_DAYS") {
            if let Ok(days) = value.parse() {
                self.fixity.interval_days = days;
            }
        }
        if let Ok(value) = std::env::var("ARCHIVE_FIXITY_ON_STARTUP") {
            self.fixity.on_startup = parse_bool(&value, self.fixity.on_startup);
        }
        if let Ok(value) = std::env::var("ARCHIVE_LOG_LEVEL") {
            self.log_level = value;
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.archive_path.join(".catalog").join("archive.db"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved config to {:?}", path);
        Ok(())
    }
}

fn parse_bool(raw: &str, fallback: bool) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            version: Self::target_version(),
            archive_path: PathBuf::new(),
            catalog_path: None,
            import: ImportDefaults::default(),
            fixity: FixityConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Migrate for ArchiveConfig {
    fn current_version(&self) -> u32 {
        self.version
    }

    fn target_version() -> u32 {
        1
    }

    fn migrate(&mut self) -> Result<()> {
        match self.version {
            0 => {
                self.version = 1;
                Ok(())
            }
            1 => Ok(()),
            v => Err(anyhow!("Unknown config version: {v}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_defaults() {
        let config = ArchiveConfig::default();
        assert!(!config.import.delete_originals);
        assert!(!config.import.use_hardlinks);
        assert!(config.import.verify_checksums);
        assert_eq!(config.fixity.interval_days, 30);
        assert!(!config.fixity.on_startup);
    }

    #[test]
    fn catalog_path_defaults_under_archive() {
        let mut config = ArchiveConfig::default();
        config.archive_path = PathBuf::from("/data/archive");
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("/data/archive/.catalog/archive.db")
        );
        config.catalog_path = Some(PathBuf::from("/elsewhere/cat.db"));
        assert_eq!(config.catalog_path(), PathBuf::from("/elsewhere/cat.db"));
    }

    #[test]
    fn bool_parsing() {
        assert!(parse_bool("true", false));
        assert!(parse_bool("1", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("garbage", true));
    }
}
