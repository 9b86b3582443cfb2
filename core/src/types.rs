//! Content hierarchy type definitions.
//!
//! This module defines the three-level editorial hierarchy stored by the
//! platform: a [`Quarterly`] owns [`Lesson`]s, and each lesson owns
//! [`LessonDay`]s. Row types carry database ids; the `New*` types describe
//! content that has not been written yet. All types round-trip through
//! [`serde`] so the upstream extraction feed can deliver them as JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::normalize::LessonFields;
use crate::validate::ValidationError;

/// Audience a quarterly is written for.
///
/// # Examples
///
/// ```
/// use quarterly_core::QuarterlyKind;
///
/// let kind: QuarterlyKind = "youth".parse().unwrap();
/// assert_eq!(kind, QuarterlyKind::Youth);
/// assert_eq!(kind.as_str(), "youth");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuarterlyKind {
    /// Adult study guide (the default).
    #[default]
    Adult,
    /// Youth study guide.
    Youth,
    /// Children's study guide.
    Kids,
}

impl QuarterlyKind {
    /// Every kind, in display order.
    pub const ALL: [QuarterlyKind; 3] = [Self::Adult, Self::Youth, Self::Kids];

    /// Returns the lowercase storage form of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adult => "adult",
            Self::Youth => "youth",
            Self::Kids => "kids",
        }
    }
}

impl fmt::Display for QuarterlyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuarterlyKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidKind(s.to_string()))
    }
}

/// Day of the lesson week. The week starts on Sabbath and ends on Friday.
///
/// # Examples
///
/// ```
/// use quarterly_core::DayName;
///
/// assert_eq!(DayName::WEEK[0], DayName::Sabbath);
/// assert_eq!("friday".parse::<DayName>().unwrap(), DayName::Friday);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayName {
    Sabbath,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl DayName {
    /// The lesson week in reading order.
    pub const WEEK: [DayName; 7] = [
        Self::Sabbath,
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    /// Returns the capitalized storage form of the day.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sabbath => "Sabbath",
            Self::Sunday => "Sunday",
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::WEEK
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidDayName(s.to_string()))
    }
}

/// A quarterly study guide as stored in the `quarterly` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarterly {
    pub id: i64,
    pub title: String,
    pub kind: QuarterlyKind,
    /// Quarter of the year, 1 through 4.
    pub quarter: u8,
    pub year: i32,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// A quarterly that has not been written to the store yet.
///
/// # Examples
///
/// ```
/// use quarterly_core::{NewQuarterly, QuarterlyKind};
///
/// let q = NewQuarterly::new("Lessons on Faith", QuarterlyKind::Adult, 1, 2025)
///     .with_description("A study of Hebrews 11");
/// assert_eq!(q.quarter, 1);
/// assert!(q.cover_url.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuarterly {
    pub title: String,
    #[serde(default)]
    pub kind: QuarterlyKind,
    pub quarter: u8,
    pub year: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl NewQuarterly {
    /// Creates a quarterly with no description or cover.
    pub fn new(title: impl Into<String>, kind: QuarterlyKind, quarter: u8, year: i32) -> Self {
        Self {
            title: title.into(),
            kind,
            quarter,
            year,
            description: None,
            cover_url: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the cover image URL.
    pub fn with_cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(url.into());
        self
    }
}

/// A weekly lesson as stored in the `lesson` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub quarterly_id: i64,
    pub title: String,
    pub memory_verse: Option<String>,
    pub study_helps: Option<String>,
    pub study_aim: Option<String>,
}

impl Lesson {
    /// Returns the free-text fields of this lesson.
    pub fn fields(&self) -> LessonFields {
        LessonFields {
            memory_verse: self.memory_verse.clone(),
            study_helps: self.study_helps.clone(),
            study_aim: self.study_aim.clone(),
        }
    }
}

/// A lesson that has not been written to the store yet.
///
/// The owning quarterly is supplied separately when inserting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub memory_verse: Option<String>,
    #[serde(default)]
    pub study_helps: Option<String>,
    #[serde(default)]
    pub study_aim: Option<String>,
}

impl NewLesson {
    /// Creates a lesson with no free-text fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            memory_verse: None,
            study_helps: None,
            study_aim: None,
        }
    }

    /// Sets the memory verse.
    pub fn with_memory_verse(mut self, value: impl Into<String>) -> Self {
        self.memory_verse = Some(value.into());
        self
    }

    /// Sets the study helps.
    pub fn with_study_helps(mut self, value: impl Into<String>) -> Self {
        self.study_helps = Some(value.into());
        self
    }

    /// Sets the study aim.
    pub fn with_study_aim(mut self, value: impl Into<String>) -> Self {
        self.study_aim = Some(value.into());
        self
    }

    /// Returns a copy with every free-text field trimmed at its stop word.
    pub fn normalized(&self) -> Self {
        let fields = LessonFields {
            memory_verse: self.memory_verse.clone(),
            study_helps: self.study_helps.clone(),
            study_aim: self.study_aim.clone(),
        }
        .normalized();
        Self {
            title: self.title.trim().to_string(),
            memory_verse: fields.memory_verse,
            study_helps: fields.study_helps,
            study_aim: fields.study_aim,
        }
    }
}

/// A daily reading as stored in the `lesson_day` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDay {
    pub id: i64,
    pub lesson_id: i64,
    pub day_name: DayName,
    pub content: String,
}

/// A daily reading that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLessonDay {
    pub day_name: DayName,
    #[serde(default)]
    pub content: String,
}

impl NewLessonDay {
    pub fn new(day_name: DayName, content: impl Into<String>) -> Self {
        Self {
            day_name,
            content: content.into(),
        }
    }
}

/// A complete quarterly document as delivered by the extraction feed.
///
/// The quarterly fields sit at the top level of the JSON object next to a
/// `lessons` array; each lesson carries its own `days` array.
///
/// # Examples
///
/// ```
/// use quarterly_core::QuarterlyImport;
///
/// let doc: QuarterlyImport = serde_json::from_str(r#"{
///     "title": "Lessons on Faith",
///     "kind": "adult",
///     "quarter": 1,
///     "year": 2025,
///     "lessons": [
///         { "title": "By Faith", "days": [{ "day_name": "Sabbath", "content": "Read Heb 11" }] }
///     ]
/// }"#).unwrap();
/// assert_eq!(doc.lessons.len(), 1);
/// assert_eq!(doc.lessons[0].days.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyImport {
    #[serde(flatten)]
    pub quarterly: NewQuarterly,
    #[serde(default)]
    pub lessons: Vec<LessonImport>,
}

/// One lesson of a [`QuarterlyImport`] together with its days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonImport {
    #[serde(flatten)]
    pub lesson: NewLesson,
    #[serde(default)]
    pub days: Vec<NewLessonDay>,
}

/// Row counts for the three hierarchy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HierarchyCounts {
    pub quarterlies: usize,
    pub lessons: usize,
    pub lesson_days: usize,
}

impl HierarchyCounts {
    /// Returns `true` when every table is empty.
    pub fn is_empty(&self) -> bool {
        self.quarterlies == 0 && self.lessons == 0 && self.lesson_days == 0
    }
}

impl fmt::Display for HierarchyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{quarterlies: {}, lessons: {}, lesson_days: {}}}",
            self.quarterlies, self.lessons, self.lesson_days
        )
    }
}
