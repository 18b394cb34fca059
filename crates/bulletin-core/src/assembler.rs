//! Report card assembly.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::mention::Mention;
use crate::model::{EvaluationStatus, ReportCard, Student, SubjectAverage};

/// Caller-owned inputs that are not derived from grades.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    /// Date stamped on every card; excluded from card equality.
    pub generated_on: NaiveDate,
    /// Class-wide general remark, overriding the configured default.
    pub general_remark: Option<String>,
    /// Per-student general remarks, keyed by student id.
    pub remarks: BTreeMap<String, String>,
}

impl GenerationContext {
    pub fn new(generated_on: NaiveDate) -> Self {
        Self {
            generated_on,
            general_remark: None,
            remarks: BTreeMap::new(),
        }
    }

    /// Context dated today (local time).
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn with_general_remark(mut self, remark: impl Into<String>) -> Self {
        self.general_remark = Some(remark.into());
        self
    }

    pub fn with_student_remark(
        mut self,
        student_id: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        self.remarks.insert(student_id.into(), remark.into());
        self
    }

    /// Remark for a student: per-student, then class-wide, then `fallback`.
    pub fn remark_for<'a>(&'a self, student_id: &str, fallback: &'a str) -> &'a str {
        self.remarks
            .get(student_id)
            .or(self.general_remark.as_ref())
            .map(String::as_str)
            .unwrap_or(fallback)
    }
}

/// Computed results for one student, before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentResult {
    pub subjects: Vec<SubjectAverage>,
    pub general_average: f64,
    pub general_rank: Option<u32>,
    pub mention: Option<Mention>,
}

/// Deterministic report card id for (school year, class, trimester, student).
pub fn report_card_id(school_year: &str, class_id: &str, trimester: u8, student_id: &str) -> Uuid {
    let name = format!("bulletin:{school_year}:{class_id}:T{trimester}:{student_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Builds the report cards of one (class, trimester).
#[derive(Debug, Clone, Copy)]
pub struct ReportCardAssembler<'a> {
    pub school_year: &'a str,
    pub class_id: &'a str,
    pub trimester: u8,
    pub default_remark: &'a str,
    pub context: &'a GenerationContext,
}

impl ReportCardAssembler<'_> {
    /// Compose a report card.
    ///
    /// A student without subject averages gets a `NotEvaluated` card with
    /// a zero general average and neither rank nor mention, whatever
    /// `result` says.
    pub fn assemble(
        &self,
        student: &Student,
        result: StudentResult,
        ranked_students: usize,
    ) -> ReportCard {
        let evaluated = !result.subjects.is_empty();
        let (status, general_average, general_rank, mention) = if evaluated {
            (
                EvaluationStatus::Evaluated,
                result.general_average,
                result.general_rank,
                result.mention,
            )
        } else {
            (EvaluationStatus::NotEvaluated, 0.0, None, None)
        };

        ReportCard {
            id: report_card_id(self.school_year, self.class_id, self.trimester, &student.id),
            student_id: student.id.clone(),
            student_name: student.full_name(),
            class_id: self.class_id.to_string(),
            trimester: self.trimester,
            school_year: self.school_year.to_string(),
            subjects: result.subjects,
            general_average,
            general_rank,
            ranked_students,
            mention,
            general_remark: self
                .context
                .remark_for(&student.id, self.default_remark)
                .to_string(),
            status,
            generated_on: self.context.generated_on,
        }
    }
}
