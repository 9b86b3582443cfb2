//! Core types for the quarterly content hierarchy and its migrations.
//!
//! This crate defines the data model shared by the store and the CLI:
//!
//! - [`NewQuarterly`] / [`Quarterly`]: a study guide for one quarter of a
//!   year, owning its lessons.
//! - [`NewLesson`] / [`Lesson`]: a weekly lesson, owning its daily readings.
//! - [`NewLessonDay`] / [`LessonDay`]: one reading, Sabbath through Friday.
//! - [`QuarterlyImport`]: a nested document from the extraction feed.
//! - [`MigrationVersion`]: a typed, numerically ordered migration version.
//!
//! Validation ([`validate_quarterly`], [`validate_import`]) rejects bad
//! content before it reaches the database. Normalization
//! ([`trim_at_stop_word`], [`LessonFields`]) strips the boilerplate the
//! extraction feed leaves at the end of lesson fields.
//!
//! # Example
//!
//! ```
//! use quarterly_core::*;
//!
//! let quarterly = NewQuarterly::new("Lessons on Faith", QuarterlyKind::Adult, 1, 2025);
//! assert!(validate_quarterly(&quarterly).is_empty());
//!
//! let lesson = NewLesson::new("By Faith Abel")
//!     .with_memory_verse("Hebrews 11:4 STUDY HELPS: Genesis 4")
//!     .normalized();
//! assert_eq!(lesson.memory_verse.as_deref(), Some("Hebrews 11:4"));
//!
//! assert_eq!(slugify("Add Index"), "add_index");
//! ```

mod normalize;
mod types;
mod validate;
mod version;

pub use normalize::{
    LessonFields, MEMORY_VERSE_STOP_WORD, STUDY_AIM_STOP_WORD, STUDY_HELPS_STOP_WORD,
    trim_at_stop_word,
};
pub use types::*;
pub use validate::{
    MAX_YEAR, MIN_YEAR, ValidationError, validate_import, validate_lesson, validate_quarterly,
};
pub use version::{MigrationVersion, VERSION_WIDTH, migration_filename, slugify};
