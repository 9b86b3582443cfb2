//! New migration file generation.
//!
//! [`MigrationGenerator::create_migration`] numbers a new migration one past
//! the highest version already in the directory (not one past the file
//! count, so gaps are never refilled) and writes a template the author fills
//! in.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};

use quarterly_core::{MigrationVersion, migration_filename, slugify};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::store::{DOWN_MARKER, MigrationDir, MigrationFile, UP_MARKER};

/// Writes new, correctly numbered migration files into a directory.
///
/// # Examples
///
/// ```no_run
/// use quarterly_db::{MigrationDir, MigrationGenerator};
///
/// let dir = MigrationDir::create("migrations").unwrap();
/// let file = MigrationGenerator::new(&dir).create_migration("Add Index").unwrap();
/// println!("created {}", file.path.display());
/// ```
pub struct MigrationGenerator<'a> {
    dir: &'a MigrationDir,
}

impl<'a> MigrationGenerator<'a> {
    pub fn new(dir: &'a MigrationDir) -> Self {
        Self { dir }
    }

    /// Creates `<next-version>_<slug>.sql` from `name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidName`] if `name` has no letters or digits.
    /// - [`StoreError::VersionCollision`] if the target file already exists.
    ///   The generator never overwrites a file.
    /// - [`StoreError::DuplicateVersion`] if the directory is already
    ///   inconsistent.
    pub fn create_migration(&self, name: &str) -> Result<MigrationFile> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        let latest = self.dir.max_version()?;
        let version = MigrationVersion::next_after(latest).ok_or(StoreError::VersionOverflow)?;
        let path = self.dir.path().join(migration_filename(version, &slug));

        let content = render_template(version, &slug, &chrono::Utc::now().to_rfc3339());

        // create_new fails instead of truncating if the path was taken
        // between the scan and the write.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::VersionCollision(path));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(content.as_bytes())?;
        file.flush()?;

        info!(version = %version, slug = %slug, path = %path.display(), "Created migration");
        MigrationFile::parse(version, slug, path, &content)
    }
}

/// Renders the boilerplate for a new migration.
pub fn render_template(version: MigrationVersion, slug: &str, created: &str) -> String {
    format!(
        "{UP_MARKER}\n\
         -- Migration: {version}_{slug}\n\
         -- Created: {created}\n\
         --\n\
         -- Statements in this section run inside one transaction together with\n\
         -- the ledger update.\n\
         \n\
         -- Migration {version}_{slug} completed successfully\n\
         \n\
         {DOWN_MARKER}\n\
         -- Statements that undo this migration. Leave this section without\n\
         -- statements if the change cannot be reversed; rollback will then\n\
         -- report that manual intervention is required.\n"
    )
}
