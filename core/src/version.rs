//! Migration version numbers and name slugs.
//!
//! Versions are parsed once from a migration filename prefix and carried as
//! [`MigrationVersion`] from then on, so ordering is always numeric.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum rendered width of a version in a migration filename.
pub const VERSION_WIDTH: usize = 3;

/// A migration version. Always greater than zero.
///
/// Renders zero-padded to [`VERSION_WIDTH`] digits and orders numerically.
///
/// # Examples
///
/// ```
/// use quarterly_core::MigrationVersion;
///
/// let v = MigrationVersion::new(6).unwrap();
/// assert_eq!(v.to_string(), "006");
/// assert!(MigrationVersion::new(0).is_none());
/// assert!(MigrationVersion::new(10).unwrap() > MigrationVersion::new(9).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MigrationVersion(u32);

impl MigrationVersion {
    /// The first version handed out to a new migrations directory.
    pub const FIRST: MigrationVersion = MigrationVersion(1);

    /// Returns `None` for version zero.
    pub fn new(version: u32) -> Option<Self> {
        (version > 0).then_some(Self(version))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the version after `latest`, or [`FIRST`](Self::FIRST) when
    /// there is none.
    pub fn next_after(latest: Option<MigrationVersion>) -> Option<Self> {
        match latest {
            None => Some(Self::FIRST),
            Some(v) => v.0.checked_add(1).map(Self),
        }
    }

    /// Parses the leading digits of a filename stem.
    pub fn parse_prefix(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().and_then(Self::new)
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = VERSION_WIDTH)
    }
}

impl TryFrom<u32> for MigrationVersion {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "migration version must be greater than zero".to_string())
    }
}

impl From<MigrationVersion> for u32 {
    fn from(value: MigrationVersion) -> Self {
        value.0
    }
}

/// Normalizes a human-supplied migration name into a filename slug.
///
/// The name is lowercased and every character outside `[a-z0-9]` becomes
/// `_`. Runs of `_` collapse to one and leading/trailing `_` are dropped, so
/// the result matches `[a-z0-9_]*`. An empty result means the name had no
/// usable characters.
///
/// # Examples
///
/// ```
/// use quarterly_core::slugify;
///
/// assert_eq!(slugify("Add Index"), "add_index");
/// assert_eq!(slugify("  lesson--day / cascade! "), "lesson_day_cascade");
/// assert_eq!(slugify("!!!"), "");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Builds the filename for a migration: `<version>_<slug>.sql`.
pub fn migration_filename(version: MigrationVersion, slug: &str) -> String {
    format!("{version}_{slug}.sql")
}
