//! Content validation.
//!
//! Validates quarterlies, lessons, and whole import documents before they
//! reach the store, catching out-of-range quarters, implausible years, empty
//! titles, and duplicate days.
//!
//! # Examples
//!
//! ```
//! use quarterly_core::*;
//!
//! let good = NewQuarterly::new("Lessons on Faith", QuarterlyKind::Adult, 2, 2025);
//! assert!(validate_quarterly(&good).is_empty());
//!
//! let bad = NewQuarterly::new("Lessons on Faith", QuarterlyKind::Adult, 5, 2025);
//! assert_eq!(validate_quarterly(&bad), vec![ValidationError::QuarterOutOfRange(5)]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{NewLesson, NewQuarterly, QuarterlyImport};

/// Earliest accepted quarterly year.
pub const MIN_YEAR: i32 = 1900;
/// Latest accepted quarterly year.
pub const MAX_YEAR: i32 = 2200;

/// Content validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Quarterly title is empty or whitespace-only.
    #[error("quarterly title cannot be empty")]
    EmptyQuarterlyTitle,
    /// Quarter is not in 1..=4.
    #[error("quarter must be between 1 and 4, got {0}")]
    QuarterOutOfRange(u8),
    /// Year is outside the accepted range.
    #[error("year {0} is outside {MIN_YEAR}..={MAX_YEAR}")]
    YearOutOfRange(i32),
    /// Lesson title is empty or whitespace-only.
    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,
    /// Unknown quarterly kind string.
    #[error("invalid quarterly kind '{0}': expected adult, youth, or kids")]
    InvalidKind(String),
    /// Unknown day name string.
    #[error("invalid day name '{0}': expected Sabbath through Friday")]
    InvalidDayName(String),
    /// The same day appears twice within one lesson.
    #[error("lesson '{lesson}' has more than one {day} reading")]
    DuplicateLessonDay { lesson: String, day: String },
}

/// Validates a quarterly's own fields.
pub fn validate_quarterly(quarterly: &NewQuarterly) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if quarterly.title.trim().is_empty() {
        errors.push(ValidationError::EmptyQuarterlyTitle);
    }
    if !(1..=4).contains(&quarterly.quarter) {
        errors.push(ValidationError::QuarterOutOfRange(quarterly.quarter));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&quarterly.year) {
        errors.push(ValidationError::YearOutOfRange(quarterly.year));
    }
    errors
}

/// Validates a lesson's own fields.
pub fn validate_lesson(lesson: &NewLesson) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if lesson.title.trim().is_empty() {
        errors.push(ValidationError::EmptyLessonTitle);
    }
    errors
}

/// Validates a full import document, including every lesson and its days.
///
/// All errors are collected rather than stopping at the first.
pub fn validate_import(doc: &QuarterlyImport) -> Vec<ValidationError> {
    let mut errors = validate_quarterly(&doc.quarterly);
    for entry in &doc.lessons {
        errors.extend(validate_lesson(&entry.lesson));

        let mut seen = HashSet::new();
        for day in &entry.days {
            if !seen.insert(day.day_name) {
                errors.push(ValidationError::DuplicateLessonDay {
                    lesson: entry.lesson.title.clone(),
                    day: day.day_name.to_string(),
                });
            }
        }
    }
    errors
}
