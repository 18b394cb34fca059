//! Period filtering.
//!
//! Places every exam in exactly one trimester using explicit `[start, end)`
//! date windows and numeric date comparison, then keeps the exams and grades
//! of the requested trimester.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DataQualityWarning;
use crate::model::{Exam, ExamType, Grade};

/// Half-open date window of one trimester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimesterWindow {
    /// Trimester number, 1 to 3.
    pub number: u8,
    /// First day (inclusive).
    pub start: NaiveDate,
    /// First day after the trimester (exclusive).
    pub end: NaiveDate,
}

impl TrimesterWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn overlaps(&self, other: &TrimesterWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Parse an exam date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and the
/// `YYYY-MM-DD HH:MM:SS[.fff]Z` form record stores commonly emit.
pub fn parse_exam_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.fZ")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Where an exam falls in the school calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Trimester(u8),
    OutsideCalendar(NaiveDate),
    UnparseableDate,
}

/// Exams and grades retained for one trimester.
#[derive(Debug, Clone, Default)]
pub struct PeriodSelection<'a> {
    pub exams: Vec<&'a Exam>,
    pub grades: Vec<&'a Grade>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Selects the exams and grades of one trimester.
#[derive(Debug, Clone, Copy)]
pub struct PeriodFilter<'c> {
    calendar: &'c [TrimesterWindow],
}

impl<'c> PeriodFilter<'c> {
    pub fn new(calendar: &'c [TrimesterWindow]) -> Self {
        Self { calendar }
    }

    /// Place an exam in the calendar.
    ///
    /// End-of-trimester exams carrying a configured `period` tag belong to
    /// that trimester; every other exam is placed by its date.
    pub fn place(&self, exam: &Exam) -> Placement {
        let Some(date) = parse_exam_date(&exam.date) else {
            return Placement::UnparseableDate;
        };

        if exam.exam_type == ExamType::TrimesterExam {
            if let Some(tag) = exam.period {
                if self.calendar.iter().any(|w| w.number == tag) {
                    return Placement::Trimester(tag);
                }
            }
        }

        self.calendar
            .iter()
            .find(|w| w.contains(date))
            .map(|w| Placement::Trimester(w.number))
            .unwrap_or(Placement::OutsideCalendar(date))
    }

    /// Keep the exams placed in `trimester` and the grades that reference them.
    ///
    /// Exams with an unparseable date, or outside every window, are excluded
    /// and reported as warnings.
    pub fn filter<'a, E, G>(&self, trimester: u8, exams: E, grades: G) -> PeriodSelection<'a>
    where
        E: IntoIterator<Item = &'a Exam>,
        G: IntoIterator<Item = &'a Grade>,
    {
        let mut selection = PeriodSelection::default();

        for exam in exams {
            match self.place(exam) {
                Placement::Trimester(n) if n == trimester => selection.exams.push(exam),
                Placement::Trimester(_) => {}
                placement => selection.warnings.extend(placement_warning(exam, placement)),
            }
        }

        let kept: HashSet<&str> = selection.exams.iter().map(|e| e.id.as_str()).collect();
        selection.grades = grades
            .into_iter()
            .filter(|g| kept.contains(g.exam_id.as_str()))
            .collect();

        tracing::debug!(
            trimester,
            exams = selection.exams.len(),
            grades = selection.grades.len(),
            "period filter applied"
        );

        selection
    }

    /// Warnings for every exam that no trimester can hold.
    pub fn check<'a, E>(&self, exams: E) -> Vec<DataQualityWarning>
    where
        E: IntoIterator<Item = &'a Exam>,
    {
        exams
            .into_iter()
            .filter_map(|exam| placement_warning(exam, self.place(exam)))
            .collect()
    }
}

/// Warnings for exams whose date cannot be read, without a calendar.
pub fn check_exam_dates<'a, E>(exams: E) -> Vec<DataQualityWarning>
where
    E: IntoIterator<Item = &'a Exam>,
{
    exams
        .into_iter()
        .filter(|exam| parse_exam_date(&exam.date).is_none())
        .map(|exam| DataQualityWarning::UnparseableExamDate {
            exam_id: exam.id.clone(),
            date: exam.date.clone(),
        })
        .collect()
}

fn placement_warning(exam: &Exam, placement: Placement) -> Option<DataQualityWarning> {
    match placement {
        Placement::Trimester(_) => None,
        Placement::OutsideCalendar(date) => Some(DataQualityWarning::ExamOutsideCalendar {
            exam_id: exam.id.clone(),
            date: date.to_string(),
        }),
        Placement::UnparseableDate => Some(DataQualityWarning::UnparseableExamDate {
            exam_id: exam.id.clone(),
            date: exam.date.clone(),
        }),
    }
}
