//! In-memory repository and sink.
//!
//! The repository plays the role of the grade-entry screens: grades go
//! through a [`GradeBook`], so out-of-range values and dangling references
//! are rejected on entry and a second grade for the same (student, exam)
//! replaces the first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use bulletin_core::error::ValidationError;
use bulletin_core::model::{Exam, Grade, GradeSnapshot, Student, Subject};
use bulletin_core::parser::SchoolDataset;
use bulletin_core::report::ReportCardBatch;
use bulletin_core::traits::{GradeRepository, ReportCardSink};
use bulletin_core::validation::{GradeBook, RecordOutcome};

use crate::error::StoreError;

#[derive(Debug, Default)]
struct Records {
    school_year: String,
    students: Vec<Student>,
    subjects: Vec<Subject>,
    exams: Vec<Exam>,
    book: GradeBook,
}

impl Records {
    fn dataset(&self) -> SchoolDataset {
        SchoolDataset {
            school_year: self.school_year.clone(),
            students: self.students.clone(),
            subjects: self.subjects.clone(),
            exams: self.exams.clone(),
            grades: self.book.grades().to_vec(),
        }
    }
}

/// Repository holding one school year in memory.
pub struct InMemoryRepository {
    records: Mutex<Records>,
    /// Number of snapshots served.
    call_count: AtomicU32,
}

impl InMemoryRepository {
    pub fn new(school_year: impl Into<String>) -> Self {
        Self {
            records: Mutex::new(Records {
                school_year: school_year.into(),
                ..Records::default()
            }),
            call_count: AtomicU32::new(0),
        }
    }

    /// Seed from a dataset. Grades are entered one by one; the rejected
    /// ones are returned alongside the repository.
    pub fn from_dataset(dataset: SchoolDataset) -> (Self, Vec<ValidationError>) {
        let repo = Self::new(dataset.school_year);
        for student in dataset.students {
            repo.add_student(student);
        }
        for subject in dataset.subjects {
            repo.add_subject(subject);
        }
        for exam in dataset.exams {
            repo.add_exam(exam);
        }
        let rejected = dataset
            .grades
            .into_iter()
            .filter_map(|grade| repo.record_grade(grade).err())
            .collect();
        (repo, rejected)
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_student(&self, student: Student) {
        let mut records = self.records();
        records.book.register_student(student.id.clone());
        records.students.push(student);
    }

    pub fn add_subject(&self, subject: Subject) {
        self.records().subjects.push(subject);
    }

    pub fn add_exam(&self, exam: Exam) {
        let mut records = self.records();
        records.book.register_exam(exam.id.clone());
        records.exams.push(exam);
    }

    /// Enter a grade, replacing any earlier grade for the same pair.
    pub fn record_grade(&self, grade: Grade) -> Result<RecordOutcome, ValidationError> {
        let outcome = self.records().book.record(grade);
        if let Err(e) = &outcome {
            tracing::warn!("grade entry rejected: {e}");
        }
        outcome
    }

    pub fn grade_count(&self) -> usize {
        self.records().book.len()
    }

    /// Get the number of snapshots served.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GradeRepository for InMemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_snapshot(&self, class_id: &str, school_year: &str) -> Result<GradeSnapshot> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let dataset = self.records().dataset();
        if dataset.school_year != school_year {
            return Err(StoreError::SchoolYearMismatch {
                expected: school_year.to_string(),
                found: dataset.school_year,
            }
            .into());
        }
        if !dataset.class_ids().iter().any(|c| c == class_id) {
            return Err(StoreError::ClassNotFound {
                class_id: class_id.to_string(),
                school_year: school_year.to_string(),
            }
            .into());
        }
        Ok(dataset.snapshot_for(class_id))
    }

    async fn list_classes(&self, school_year: &str) -> Result<Vec<String>> {
        let dataset = self.records().dataset();
        if dataset.school_year != school_year {
            return Ok(Vec::new());
        }
        Ok(dataset.class_ids())
    }
}

/// Sink keeping the latest batch per (school year, class, trimester).
#[derive(Default)]
pub struct InMemorySink {
    batches: Mutex<BTreeMap<(String, String, u8), ReportCardBatch>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, school_year: &str, class_id: &str, trimester: u8) -> Option<ReportCardBatch> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(school_year.to_string(), class_id.to_string(), trimester))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportCardSink for InMemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, batch: &ReportCardBatch) -> Result<()> {
        let key = (
            batch.school_year.clone(),
            batch.class_id.clone(),
            batch.trimester,
        );
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, batch.clone());
        Ok(())
    }
}
