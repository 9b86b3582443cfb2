//! Error types for migration file and configuration operations.
//!
//! Provides a unified error type covering I/O, serialization, migration
//! naming, and migration directory consistency failures.

use std::path::PathBuf;

use quarterly_core::MigrationVersion;
use thiserror::Error;

/// Errors that can occur while reading or writing migration files and
/// configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Migration name is empty after normalization.
    #[error("invalid migration name '{0}': must contain at least one letter or digit")]
    InvalidName(String),

    /// The migrations directory does not exist.
    #[error("migrations directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Two migration files declare the same version.
    #[error("duplicate migration version {version}: {} and {}", .first.display(), .second.display())]
    DuplicateVersion {
        version: MigrationVersion,
        first: PathBuf,
        second: PathBuf,
    },

    /// The generator computed a version or path that is already taken.
    #[error("refusing to overwrite existing migration {}", .0.display())]
    VersionCollision(PathBuf),

    /// Every version number has been used.
    #[error("migration version space exhausted")]
    VersionOverflow,

    /// A migration file has no up script.
    #[error("migration {} has an empty up script", .0.display())]
    MissingUpScript(PathBuf),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
