//! Error and warning types for the report card engine.
//!
//! Three tiers, matching how each one propagates:
//! - [`ValidationError`] rejects a single input record; the batch continues.
//! - [`DataQualityWarning`] excludes a record from computation and is logged.
//! - [`ConfigError`] is fatal and raised before any computation starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A grade record rejected at the input boundary.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// The score is outside the closed range [0, 20] (or not a number).
    #[error("grade {value} for student '{student_id}' on exam '{exam_id}' is outside [0, 20]")]
    ScoreOutOfRange {
        student_id: String,
        exam_id: String,
        value: f64,
    },

    /// The grade references a student that does not exist.
    #[error("grade on exam '{exam_id}' references unknown student '{student_id}'")]
    UnknownStudent { student_id: String, exam_id: String },

    /// The grade references an exam that does not exist.
    #[error("grade for student '{student_id}' references unknown exam '{exam_id}'")]
    UnknownExam { student_id: String, exam_id: String },
}

impl ValidationError {
    /// The student id of the rejected record.
    pub fn student_id(&self) -> &str {
        match self {
            ValidationError::ScoreOutOfRange { student_id, .. }
            | ValidationError::UnknownStudent { student_id, .. }
            | ValidationError::UnknownExam { student_id, .. } => student_id,
        }
    }

    /// The exam id of the rejected record.
    pub fn exam_id(&self) -> &str {
        match self {
            ValidationError::ScoreOutOfRange { exam_id, .. }
            | ValidationError::UnknownStudent { exam_id, .. }
            | ValidationError::UnknownExam { exam_id, .. } => exam_id,
        }
    }
}

/// A record excluded from computation because its data cannot be trusted.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    #[error("exam '{exam_id}' has an unparseable date '{date}'")]
    UnparseableExamDate { exam_id: String, date: String },

    #[error("subject '{subject}' has a non-positive coefficient ({coefficient})")]
    NonPositiveCoefficient { subject: String, coefficient: i64 },

    #[error("subject '{subject}' is declared more than once; the first declaration is used")]
    DuplicateSubject { subject: String },

    #[error("exam '{exam_id}' references unknown subject '{subject}'")]
    UnknownSubject { exam_id: String, subject: String },

    #[error("exam '{exam_id}' dated {date} falls outside every configured trimester")]
    ExamOutsideCalendar { exam_id: String, date: String },

    #[error("exam '{exam_id}' belongs to class '{class_id}', not the evaluated class")]
    ExamClassMismatch { exam_id: String, class_id: String },

    #[error("exam '{exam_id}' has a non-positive coefficient ({coefficient})")]
    NonPositiveExamCoefficient { exam_id: String, coefficient: f64 },
}

/// Invalid or incomplete engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no school year configured")]
    MissingSchoolYear,

    #[error("no trimester boundaries configured")]
    MissingTrimesters,

    #[error("no mention thresholds configured")]
    MissingMentions,

    #[error("trimester number {0} must be between 1 and 3")]
    InvalidTrimesterNumber(u8),

    #[error("trimester {0} is configured more than once")]
    DuplicateTrimester(u8),

    #[error("trimester {number} has an empty window ({start} .. {end})")]
    EmptyTrimesterWindow {
        number: u8,
        start: String,
        end: String,
    },

    #[error("trimesters {first} and {second} overlap")]
    OverlappingTrimesters { first: u8, second: u8 },

    #[error("mention scale is not monotonic at threshold {0}")]
    NonMonotonicMentions(f64),

    #[error("mention scale must include a band starting at or below 0 (lowest is {0})")]
    IncompleteMentionScale(f64),

    #[error("invalid date '{value}' for {field}")]
    InvalidDate { field: String, value: String },

    #[error("rounding decimals must be between 0 and 4, got {0}")]
    InvalidDecimals(u32),

    #[error("pass mark {0} is outside [0, 20]")]
    InvalidPassMark(f64),

    #[error("trimester {0} is not configured")]
    UnknownTrimester(u8),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
