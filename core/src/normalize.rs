//! Cleanup of lesson free-text fields.
//!
//! The extraction feed copies each lesson field out of a larger document, so
//! a field often runs on into the heading of the next section. Each field is
//! cut at the heading that follows it.

use serde::{Deserialize, Serialize};

/// Heading that follows the memory verse.
pub const MEMORY_VERSE_STOP_WORD: &str = "STUDY HELPS";
/// Heading that follows the study helps.
pub const STUDY_HELPS_STOP_WORD: &str = "STUDY AIM:";
/// Heading that follows the study aim.
pub const STUDY_AIM_STOP_WORD: &str = "INTRODUCTION";

/// Truncates `value` at the first occurrence of `stop_word`.
///
/// Absent values stay absent. When the stop word does not occur the value is
/// returned with surrounding whitespace stripped; otherwise only the text
/// before the stop word is kept, whitespace-stripped.
///
/// # Examples
///
/// ```
/// use quarterly_core::trim_at_stop_word;
///
/// assert_eq!(trim_at_stop_word(Some("A STUDY HELPS B"), "STUDY HELPS").as_deref(), Some("A"));
/// assert_eq!(trim_at_stop_word(Some("plain text"), "MISSING").as_deref(), Some("plain text"));
/// assert_eq!(trim_at_stop_word(None, "X"), None);
/// ```
pub fn trim_at_stop_word(value: Option<&str>, stop_word: &str) -> Option<String> {
    let value = value?;
    let kept = match value.find(stop_word) {
        Some(idx) if !stop_word.is_empty() => &value[..idx],
        _ => value,
    };
    Some(kept.trim().to_string())
}

/// The three free-text fields of a lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonFields {
    pub memory_verse: Option<String>,
    pub study_helps: Option<String>,
    pub study_aim: Option<String>,
}

impl LessonFields {
    /// Applies each field's stop word independently.
    pub fn normalized(&self) -> Self {
        Self {
            memory_verse: trim_at_stop_word(self.memory_verse.as_deref(), MEMORY_VERSE_STOP_WORD),
            study_helps: trim_at_stop_word(self.study_helps.as_deref(), STUDY_HELPS_STOP_WORD),
            study_aim: trim_at_stop_word(self.study_aim.as_deref(), STUDY_AIM_STOP_WORD),
        }
    }

    /// Returns `true` if normalization would change any field.
    pub fn needs_normalization(&self) -> bool {
        self.normalized() != *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_cuts_before_stop_word() {
        assert_eq!(
            trim_at_stop_word(Some("A STUDY HELPS B"), "STUDY HELPS").as_deref(),
            Some("A")
        );
    }

    #[test]
    fn test_trim_without_stop_word_strips_whitespace() {
        assert_eq!(
            trim_at_stop_word(Some("  plain text \n"), "MISSING").as_deref(),
            Some("plain text")
        );
    }

    #[test]
    fn test_trim_absent_value_stays_absent() {
        assert_eq!(trim_at_stop_word(None, "X"), None);
    }

    #[test]
    fn test_trim_uses_first_occurrence() {
        assert_eq!(
            trim_at_stop_word(Some("one INTRODUCTION two INTRODUCTION"), "INTRODUCTION").as_deref(),
            Some("one")
        );
    }

    #[test]
    fn test_trim_stop_word_at_start_yields_empty() {
        assert_eq!(
            trim_at_stop_word(Some("STUDY AIM: all of it"), "STUDY AIM:").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_trim_is_case_sensitive() {
        assert_eq!(
            trim_at_stop_word(Some("keep study helps here"), "STUDY HELPS").as_deref(),
            Some("keep study helps here")
        );
    }

    #[test]
    fn test_trim_empty_stop_word_only_strips() {
        assert_eq!(trim_at_stop_word(Some(" x "), "").as_deref(), Some("x"));
    }

    #[test]
    fn test_fields_use_their_own_stop_words() {
        // Each field is cut only at its own heading.
        let fields = LessonFields {
            memory_verse: Some("Ps 23:1 STUDY AIM: ignored".to_string()),
            study_helps: Some("Read Ps 23 STUDY AIM: trust".to_string()),
            study_aim: None,
        };
        let normalized = fields.normalized();
        assert_eq!(
            normalized.memory_verse.as_deref(),
            Some("Ps 23:1 STUDY AIM: ignored")
        );
        assert_eq!(normalized.study_helps.as_deref(), Some("Read Ps 23"));
        assert_eq!(normalized.study_aim, None);
    }

    #[test]
    fn test_needs_normalization() {
        let clean = LessonFields {
            memory_verse: Some("John 1:1".to_string()),
            ..Default::default()
        };
        assert!(!clean.needs_normalization());

        let dirty = LessonFields {
            study_aim: Some("Aim INTRODUCTION text".to_string()),
            ..Default::default()
        };
        assert!(dirty.needs_normalization());
    }
}
