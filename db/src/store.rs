//! Migration file store.
//!
//! A migrations directory holds one `.sql` file per schema change, named
//! `<version>_<slug>.sql` where the version is a zero-padded integer. The
//! store parses each filename once into a typed [`MigrationVersion`] and
//! yields files in ascending numeric order, so `010_x.sql` always follows
//! `009_x.sql`.
//!
//! # File layout
//!
//! ```sql
//! -- migrate:up
//! CREATE TABLE example (id INTEGER PRIMARY KEY);
//!
//! -- migrate:down
//! DROP TABLE example;
//! ```
//!
//! Everything before the `-- migrate:down` line is the up script. The down
//! section is optional; a section holding only comments counts as absent.
//!
//! # Loading
//!
//! ```no_run
//! use quarterly_db::MigrationDir;
//!
//! let dir = MigrationDir::open("migrations").unwrap();
//! for file in dir.entries().unwrap() {
//!     let file = file.unwrap();
//!     println!("{} {}", file.version, file.slug);
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quarterly_core::MigrationVersion;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Line that starts the optional up section marker.
pub const UP_MARKER: &str = "-- migrate:up";
/// Line that separates the up script from the down script.
pub const DOWN_MARKER: &str = "-- migrate:down";

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_([^/\\]+)\.sql$").expect("static regex must compile")
});

/// A migration file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: MigrationVersion,
    pub slug: String,
    pub path: PathBuf,
    pub up_script: String,
    /// `None` when the file has no down section or the section holds no
    /// statements.
    pub down_script: Option<String>,
}

impl MigrationFile {
    /// Parses file content into up and down scripts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingUpScript`] if the up section is blank.
    pub fn parse(
        version: MigrationVersion,
        slug: impl Into<String>,
        path: impl Into<PathBuf>,
        content: &str,
    ) -> Result<Self> {
        let path = path.into();
        let (up, down) = split_sections(content);
        if up.trim().is_empty() {
            return Err(StoreError::MissingUpScript(path));
        }
        let down_script = down.filter(|script| has_statements(script));
        Ok(Self {
            version,
            slug: slug.into(),
            path,
            up_script: up,
            down_script,
        })
    }

    /// Returns `<version>_<slug>`, the filename without extension.
    pub fn name(&self) -> String {
        format!("{}_{}", self.version, self.slug)
    }

    /// Returns the SHA-256 hex digest of the up script.
    ///
    /// Recorded in the ledger when the migration is applied so later edits to
    /// the file can be detected.
    pub fn checksum(&self) -> String {
        checksum(&self.up_script)
    }

    pub fn has_down_script(&self) -> bool {
        self.down_script.is_some()
    }
}

/// Returns the SHA-256 hex digest of a script.
pub fn checksum(script: &str) -> String {
    let hash = Sha256::digest(script.as_bytes());
    format!("{:x}", hash)
}

/// Splits file content at the down marker. Marker lines are dropped.
fn split_sections(content: &str) -> (String, Option<String>) {
    let mut up = String::new();
    let mut down: Option<String> = None;

    for line in content.lines() {
        let marker = line.trim();
        if marker.eq_ignore_ascii_case(DOWN_MARKER) {
            down.get_or_insert_with(String::new);
            continue;
        }
        if down.is_none() && marker.eq_ignore_ascii_case(UP_MARKER) {
            continue;
        }
        let section = match down.as_mut() {
            Some(down) => down,
            None => &mut up,
        };
        section.push_str(line);
        section.push('\n');
    }

    (up, down)
}

/// Returns `true` if the script has any line that is not blank or a `--`
/// comment.
fn has_statements(script: &str) -> bool {
    script.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with("--")
    })
}

/// Parses `<digits>_<slug>.sql` into a version and slug.
///
/// Returns `None` for names without a numeric prefix, with a zero version,
/// or with a prefix too large for a version.
pub fn parse_filename(file_name: &str) -> Option<(MigrationVersion, String)> {
    let caps = FILENAME_RE.captures(file_name)?;
    let version = MigrationVersion::parse_prefix(&caps[1])?;
    Some((version, caps[2].to_string()))
}

/// A migration found in the directory, before its content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEntry {
    pub version: MigrationVersion,
    pub slug: String,
    pub path: PathBuf,
}

impl MigrationEntry {
    /// Reads and parses the file.
    pub fn load(&self) -> Result<MigrationFile> {
        let content = std::fs::read_to_string(&self.path)?;
        MigrationFile::parse(self.version, self.slug.clone(), self.path.clone(), &content)
    }
}

impl fmt::Display for MigrationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.version, self.slug)
    }
}

/// Result of scanning a migrations directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScan {
    /// Valid migrations in ascending version order.
    pub entries: Vec<MigrationEntry>,
    /// `.sql` files whose names do not carry a usable version.
    pub rejected: Vec<PathBuf>,
}

/// Lazily loads migration files in ascending version order.
///
/// Produced by [`MigrationDir::entries`]. Each call to `next` reads one
/// file. Cloning the iterator restarts from the clone point; calling
/// [`MigrationDir::entries`] again restarts from a fresh scan.
#[derive(Debug, Clone)]
pub struct MigrationEntries {
    inner: std::vec::IntoIter<MigrationEntry>,
}

impl Iterator for MigrationEntries {
    type Item = Result<MigrationFile>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| entry.load())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for MigrationEntries {}

/// A directory of versioned migration files.
#[derive(Debug, Clone)]
pub struct MigrationDir {
    path: PathBuf,
}

impl MigrationDir {
    /// Opens an existing migrations directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DirectoryNotFound`] if `path` is not a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(StoreError::DirectoryNotFound(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Opens a migrations directory, creating it if it does not exist.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scans filenames without reading any file content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateVersion`] if two files share a version,
    /// or [`StoreError::IoError`] if the directory cannot be read.
    pub fn scan(&self) -> Result<DirectoryScan> {
        let mut by_version: BTreeMap<MigrationVersion, MigrationEntry> = BTreeMap::new();
        let mut rejected = Vec::new();

        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file()
                || file_path.extension().and_then(|e| e.to_str()) != Some("sql")
            {
                continue;
            }
            let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else {
                rejected.push(file_path);
                continue;
            };
            let Some((version, slug)) = parse_filename(file_name) else {
                warn!(path = %file_path.display(), "Skipping migration file without a version prefix");
                rejected.push(file_path);
                continue;
            };

            let migration = MigrationEntry {
                version,
                slug,
                path: file_path,
            };
            if let Some(existing) = by_version.get(&version) {
                return Err(StoreError::DuplicateVersion {
                    version,
                    first: existing.path.clone(),
                    second: migration.path,
                });
            }
            by_version.insert(version, migration);
        }

        rejected.sort();
        debug!(
            dir = %self.path.display(),
            migrations = by_version.len(),
            rejected = rejected.len(),
            "Scanned migrations directory"
        );
        Ok(DirectoryScan {
            entries: by_version.into_values().collect(),
            rejected,
        })
    }

    /// Returns a lazy iterator over all migration files in version order.
    pub fn entries(&self) -> Result<MigrationEntries> {
        let scan = self.scan()?;
        Ok(MigrationEntries {
            inner: scan.entries.into_iter(),
        })
    }

    /// Returns all valid versions in ascending order.
    pub fn versions(&self) -> Result<Vec<MigrationVersion>> {
        Ok(self.scan()?.entries.iter().map(|e| e.version).collect())
    }

    /// Returns the highest version present, if any.
    pub fn max_version(&self) -> Result<Option<MigrationVersion>> {
        Ok(self.scan()?.entries.last().map(|e| e.version))
    }

    /// Returns `.sql` files that were excluded for lacking a usable version.
    pub fn rejected(&self) -> Result<Vec<PathBuf>> {
        Ok(self.scan()?.rejected)
    }

    /// Loads the migration with the given version.
    ///
    /// Returns `Ok(None)` if no file carries that version.
    pub fn load(&self, version: MigrationVersion) -> Result<Option<MigrationFile>> {
        self.scan()?
            .entries
            .into_iter()
            .find(|e| e.version == version)
            .map(|e| e.load())
            .transpose()
    }
}
