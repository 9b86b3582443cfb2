//! Tool configuration.
//!
//! Defines the YAML-serializable settings shared by every `quarterly`
//! subcommand: where the database lives, where migrations are kept, and how
//! long to wait on a locked database.
//!
//! # Example YAML
//!
//! ```yaml
//! database: content.db
//! migrations_dir: migrations
//! busy_timeout_ms: 5000
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File picked up from the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "quarterly.yml";

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// # use quarterly_db::QuarterlyConfig;
/// let config: QuarterlyConfig = serde_yaml::from_str("database: prod.db").unwrap();
/// assert_eq!(config.database.to_str(), Some("prod.db"));
/// assert_eq!(config.busy_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarterlyConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Directory holding `<version>_<slug>.sql` files.
    pub migrations_dir: PathBuf,
    /// How long a statement waits for a lock held by another connection.
    pub busy_timeout_ms: u64,
}

impl Default for QuarterlyConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("content.db"),
            migrations_dir: PathBuf::from("migrations"),
            busy_timeout_ms: 5000,
        }
    }
}

impl QuarterlyConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else
    /// the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
