//! Migration files and configuration for the quarterly content store.
//!
//! This crate owns everything that lives on disk next to the database:
//!
//! - [`MigrationDir`]: the versioned `.sql` files, listed in numeric order.
//! - [`MigrationGenerator`]: creates the next numbered migration from a name.
//! - [`QuarterlyConfig`]: YAML settings for the CLI.
//! - [`feed_documents`] / [`load_document`]: quarterly JSON documents to import.
//!
//! # Quick start
//!
//! ```no_run
//! use quarterly_db::{MigrationDir, MigrationGenerator};
//!
//! let dir = MigrationDir::create("migrations").unwrap();
//! let created = MigrationGenerator::new(&dir).create_migration("add cover index").unwrap();
//! assert_eq!(created.slug, "add_cover_index");
//!
//! for file in dir.entries().unwrap() {
//!     let file = file.unwrap();
//!     println!("{} (down script: {})", file.name(), file.has_down_script());
//! }
//! ```

mod config;
mod error;
mod feed;
mod generator;
mod store;

pub use config::{DEFAULT_CONFIG_FILE, QuarterlyConfig};
pub use error::{Result, StoreError};
pub use feed::{feed_documents, load_document};
pub use generator::{MigrationGenerator, render_template};
pub use store::{
    DOWN_MARKER, DirectoryScan, MigrationDir, MigrationEntries, MigrationEntry, MigrationFile,
    UP_MARKER, checksum, parse_filename,
};
