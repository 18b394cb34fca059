//! Core data model types for bulletin.
//!
//! Students, subjects, exams and grades are read-only inputs supplied by a
//! grade repository. Subject averages and report cards are derived by the
//! engine and handed to persistence or rendering collaborators.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mention::Mention;

/// Lowest valid score.
pub const MIN_SCORE: f64 = 0.0;
/// Highest valid score.
pub const MAX_SCORE: f64 = 20.0;

/// An enrolled student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Unique identifier.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Class the student is assigned to (e.g. "CM2").
    pub class_id: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

impl Student {
    /// "First Last", trimmed when either part is empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A taught subject and its weight in the general average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject name, also the key exams refer to.
    pub name: String,
    /// Weight of the subject; must be at least 1 to take part in averages.
    pub coefficient: i64,
}

/// Kind of exam. Unrecognised kinds deserialize to [`ExamType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    /// Regular in-term composition, placed in a trimester by its date.
    Composition,
    /// End-of-trimester exam.
    #[serde(alias = "trimestre", alias = "trimester")]
    TrimesterExam,
    #[serde(other)]
    Other,
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamType::Composition => write!(f, "composition"),
            ExamType::TrimesterExam => write!(f, "trimester_exam"),
            ExamType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "composition" => Ok(ExamType::Composition),
            "trimester_exam" | "trimestre" | "trimester" => Ok(ExamType::TrimesterExam),
            "other" => Ok(ExamType::Other),
            other => Err(format!("unknown exam type: {other}")),
        }
    }
}

/// A scheduled exam for one subject in one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    /// Unique identifier.
    pub id: String,
    /// Display name (e.g. "Composition 1 - Mathématiques").
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
    /// Name of the subject this exam belongs to.
    pub subject: String,
    /// Class the exam was set for.
    pub class_id: String,
    /// Exam date as supplied by the repository; parsed during period filtering.
    pub date: String,
    /// Exam-level weight, distinct from the subject coefficient.
    #[serde(default = "default_exam_coefficient")]
    pub coefficient: f64,
    /// Explicit trimester tag for end-of-trimester exams.
    #[serde(default)]
    pub period: Option<u8>,
}

fn default_exam_coefficient() -> f64 {
    1.0
}

/// One student's score on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub student_id: String,
    pub exam_id: String,
    /// Score on the 0–20 scale.
    #[serde(alias = "score", alias = "grade")]
    pub value: f64,
    /// Teacher's remark for this grade.
    #[serde(default, alias = "remarks")]
    pub remark: Option<String>,
}

/// Immutable input for one class and one school year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSnapshot {
    pub school_year: String,
    pub class_id: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

/// A student's result in one subject for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAverage {
    pub subject: String,
    /// Copied verbatim from the subject.
    pub coefficient: u32,
    /// Rounded average score.
    pub average: f64,
    /// Rank within the class for this subject.
    #[serde(default)]
    pub rank: Option<u32>,
    /// Most recently entered remark among the subject's grades.
    #[serde(default)]
    pub remark: Option<String>,
    /// Number of grades that went into the average.
    pub grade_count: usize,
}

/// Whether a report card reflects actual grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// At least one subject average was computed.
    Evaluated,
    /// No qualifying grade in the period; the zero average is not a score.
    NotEvaluated,
}

/// One student's report card for one class and period.
///
/// Equality ignores `generated_on` so recomputed cards compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCard {
    /// Derived from (school year, class, trimester, student).
    pub id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub trimester: u8,
    pub school_year: String,
    pub subjects: Vec<SubjectAverage>,
    pub general_average: f64,
    /// 1-based competition rank; `None` when not evaluated.
    pub general_rank: Option<u32>,
    /// Number of students that took part in the ranking.
    pub ranked_students: usize,
    pub mention: Option<Mention>,
    pub general_remark: String,
    pub status: EvaluationStatus,
    pub generated_on: NaiveDate,
}

impl ReportCard {
    /// True when the card carries real grades.
    pub fn is_evaluated(&self) -> bool {
        self.status == EvaluationStatus::Evaluated
    }

    /// Canonical JSON of the comparable payload, without `generated_on`.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("generated_on");
        }
        serde_json::to_string(&value)
    }
}

impl PartialEq for ReportCard {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.student_id == other.student_id
            && self.student_name == other.student_name
            && self.class_id == other.class_id
            && self.trimester == other.trimester
            && self.school_year == other.school_year
            && self.subjects == other.subjects
            && self.general_average == other.general_average
            && self.general_rank == other.general_rank
            && self.ranked_students == other.ranked_students
            && self.mention == other.mention
            && self.general_remark == other.general_remark
            && self.status == other.status
    }
}
