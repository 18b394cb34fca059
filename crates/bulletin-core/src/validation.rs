//! Input validation at the repository boundary.
//!
//! Rejected grades become [`ValidationError`]s carrying their identifying
//! keys, untrustworthy subjects and exams become [`DataQualityWarning`]s,
//! and everything else flows on to aggregation.

use std::collections::{HashMap, HashSet};

use crate::config::SubjectWeighting;
use crate::error::{DataQualityWarning, ValidationError};
use crate::model::{Exam, Grade, GradeSnapshot, Subject, MAX_SCORE, MIN_SCORE};

/// Check a single grade against the known students and exams.
pub fn check_grade(
    grade: &Grade,
    student_known: bool,
    exam_known: bool,
) -> Result<(), ValidationError> {
    if !grade.value.is_finite() || grade.value < MIN_SCORE || grade.value > MAX_SCORE {
        return Err(ValidationError::ScoreOutOfRange {
            student_id: grade.student_id.clone(),
            exam_id: grade.exam_id.clone(),
            value: grade.value,
        });
    }
    if !student_known {
        return Err(ValidationError::UnknownStudent {
            student_id: grade.student_id.clone(),
            exam_id: grade.exam_id.clone(),
        });
    }
    if !exam_known {
        return Err(ValidationError::UnknownExam {
            student_id: grade.student_id.clone(),
            exam_id: grade.exam_id.clone(),
        });
    }
    Ok(())
}

/// Result of recording a grade in a [`GradeBook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// An earlier grade for the same (student, exam) pair was overwritten.
    Replaced,
}

/// Grade-entry ledger holding at most one grade per (student, exam) pair.
#[derive(Debug, Clone, Default)]
pub struct GradeBook {
    students: HashSet<String>,
    exams: HashSet<String>,
    grades: Vec<Grade>,
    index: HashMap<(String, String), usize>,
}

impl GradeBook {
    pub fn new<S, E>(students: S, exams: E) -> Self
    where
        S: IntoIterator<Item = String>,
        E: IntoIterator<Item = String>,
    {
        Self {
            students: students.into_iter().collect(),
            exams: exams.into_iter().collect(),
            grades: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Ledger seeded with the students and exams of a snapshot (no grades).
    pub fn for_snapshot(snapshot: &GradeSnapshot) -> Self {
        Self::new(
            snapshot.students.iter().map(|s| s.id.clone()),
            snapshot.exams.iter().map(|e| e.id.clone()),
        )
    }

    pub fn register_student(&mut self, student_id: impl Into<String>) {
        self.students.insert(student_id.into());
    }

    pub fn register_exam(&mut self, exam_id: impl Into<String>) {
        self.exams.insert(exam_id.into());
    }

    /// Validate and upsert a grade.
    ///
    /// A second grade for the same pair overwrites the first in place.
    pub fn record(&mut self, grade: Grade) -> Result<RecordOutcome, ValidationError> {
        check_grade(
            &grade,
            self.students.contains(&grade.student_id),
            self.exams.contains(&grade.exam_id),
        )?;

        let key = (grade.student_id.clone(), grade.exam_id.clone());
        match self.index.get(&key) {
            Some(&slot) => {
                self.grades[slot] = grade;
                Ok(RecordOutcome::Replaced)
            }
            None => {
                self.index.insert(key, self.grades.len());
                self.grades.push(grade);
                Ok(RecordOutcome::Inserted)
            }
        }
    }

    /// Look up the grade of a (student, exam) pair.
    pub fn get(&self, student_id: &str, exam_id: &str) -> Option<&Grade> {
        self.index
            .get(&(student_id.to_string(), exam_id.to_string()))
            .map(|&slot| &self.grades[slot])
    }

    /// Grades in insertion order.
    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn into_grades(self) -> Vec<Grade> {
        self.grades
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

/// The usable part of a snapshot plus everything that was set aside.
#[derive(Debug, Clone, Default)]
pub struct ValidatedSnapshot<'a> {
    /// Subjects with a positive coefficient, first declaration per name.
    pub subjects: Vec<&'a Subject>,
    /// Exams of the evaluated class referencing a usable subject.
    pub exams: Vec<&'a Exam>,
    /// Accepted grades, one per (student, exam) pair, last write wins.
    pub grades: Vec<&'a Grade>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Validate a whole snapshot without aborting on bad records.
pub fn validate_snapshot(
    snapshot: &GradeSnapshot,
    weighting: SubjectWeighting,
) -> ValidatedSnapshot<'_> {
    let mut out = ValidatedSnapshot::default();

    let mut declared_subjects = HashSet::new();
    let mut subject_names = HashSet::new();
    for subject in &snapshot.subjects {
        if !declared_subjects.insert(subject.name.as_str()) {
            out.warnings.push(DataQualityWarning::DuplicateSubject {
                subject: subject.name.clone(),
            });
            continue;
        }
        if subject.coefficient <= 0 {
            out.warnings.push(DataQualityWarning::NonPositiveCoefficient {
                subject: subject.name.clone(),
                coefficient: subject.coefficient,
            });
            continue;
        }
        subject_names.insert(subject.name.as_str());
        out.subjects.push(subject);
    }

    for exam in &snapshot.exams {
        if exam.class_id != snapshot.class_id {
            out.warnings.push(DataQualityWarning::ExamClassMismatch {
                exam_id: exam.id.clone(),
                class_id: exam.class_id.clone(),
            });
            continue;
        }
        if !declared_subjects.contains(exam.subject.as_str()) {
            out.warnings.push(DataQualityWarning::UnknownSubject {
                exam_id: exam.id.clone(),
                subject: exam.subject.clone(),
            });
            continue;
        }
        if weighting == SubjectWeighting::ExamCoefficient
            && !(exam.coefficient.is_finite() && exam.coefficient > 0.0)
        {
            out.warnings.push(DataQualityWarning::NonPositiveExamCoefficient {
                exam_id: exam.id.clone(),
                coefficient: exam.coefficient,
            });
            continue;
        }
        if subject_names.contains(exam.subject.as_str()) {
            out.exams.push(exam);
        }
    }

    let students: HashSet<&str> = snapshot.students.iter().map(|s| s.id.as_str()).collect();
    let exams: HashSet<&str> = snapshot.exams.iter().map(|e| e.id.as_str()).collect();
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();

    for grade in &snapshot.grades {
        let checked = check_grade(
            grade,
            students.contains(grade.student_id.as_str()),
            exams.contains(grade.exam_id.as_str()),
        );
        if let Err(e) = checked {
            tracing::warn!("rejected grade: {e}");
            out.errors.push(e);
            continue;
        }

        let key = (grade.student_id.as_str(), grade.exam_id.as_str());
        match slots.get(&key) {
            Some(&slot) => {
                tracing::debug!(
                    student = %grade.student_id,
                    exam = %grade.exam_id,
                    "duplicate grade overwrites earlier entry"
                );
                out.grades[slot] = grade;
            }
            None => {
                slots.insert(key, out.grades.len());
                out.grades.push(grade);
            }
        }
    }

    for warning in &out.warnings {
        tracing::warn!("{warning}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamType, Student};

    fn grade(student: &str, exam: &str, value: f64) -> Grade {
        Grade {
            student_id: student.into(),
            exam_id: exam.into(),
            value,
            remark: None,
        }
    }

    fn snapshot() -> GradeSnapshot {
        GradeSnapshot {
            school_year: "2024-2025".into(),
            class_id: "CM2".into(),
            students: vec![Student {
                id: "s1".into(),
                first_name: "Aminata".into(),
                last_name: "Traoré".into(),
                class_id: "CM2".into(),
                date_of_birth: None,
            }],
            subjects: vec![
                Subject {
                    name: "Mathématiques".into(),
                    coefficient: 3,
                },
                Subject {
                    name: "Dessin".into(),
                    coefficient: 0,
                },
            ],
            exams: vec![
                Exam {
                    id: "e1".into(),
                    name: "Composition 1".into(),
                    exam_type: ExamType::Composition,
                    subject: "Mathématiques".into(),
                    class_id: "CM2".into(),
                    date: "2024-12-15".into(),
                    coefficient: 1.0,
                    period: None,
                },
                Exam {
                    id: "e2".into(),
                    name: "Dessin libre".into(),
                    exam_type: ExamType::Composition,
                    subject: "Dessin".into(),
                    class_id: "CM2".into(),
                    date: "2024-12-16".into(),
                    coefficient: 1.0,
                    period: None,
                },
                Exam {
                    id: "e3".into(),
                    name: "Chant".into(),
                    exam_type: ExamType::Composition,
                    subject: "Musique".into(),
                    class_id: "CM2".into(),
                    date: "2024-12-17".into(),
                    coefficient: 0.0,
                    period: None,
                },
            ],
            grades: vec![],
        }
    }

    #[test]
    fn grade_of_21_rejected_at_entry() {
        let mut book = GradeBook::for_snapshot(&snapshot());
        let err = book.record(grade("s1", "e1", 21.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ScoreOutOfRange {
                student_id: "s1".into(),
                exam_id: "e1".into(),
                value: 21.0,
            }
        );
        assert!(book.is_empty());
    }

    #[test]
    fn negative_and_nan_rejected() {
        let mut book = GradeBook::for_snapshot(&snapshot());
        assert!(book.record(grade("s1", "e1", -0.5)).is_err());
        assert!(book.record(grade("s1", "e1", f64::NAN)).is_err());
        assert_eq!(book.record(grade("s1", "e1", 0.0)), Ok(RecordOutcome::Inserted));
    }

    #[test]
    fn unknown_references_rejected() {
        let mut book = GradeBook::for_snapshot(&snapshot());
        assert!(matches!(
            book.record(grade("ghost", "e1", 10.0)),
            Err(ValidationError::UnknownStudent { .. })
        ));
        assert!(matches!(
            book.record(grade("s1", "nope", 10.0)),
            Err(ValidationError::UnknownExam { .. })
        ));
    }

    #[test]
    fn second_grade_for_same_pair_overwrites() {
        let mut book = GradeBook::for_snapshot(&snapshot());
        book.record(grade("s1", "e1", 9.0)).unwrap();
        book.record(grade("s1", "e2", 12.0)).unwrap();
        assert_eq!(
            book.record(grade("s1", "e1", 13.0)),
            Ok(RecordOutcome::Replaced)
        );
        assert_eq!(book.len(), 2);
        assert_eq!(book.grades()[0].value, 13.0);
        assert_eq!(book.get("s1", "e1").unwrap().value, 13.0);
    }

    #[test]
    fn snapshot_validation_collects_everything() {
        let mut snap = snapshot();
        snap.grades = vec![
            grade("s1", "e1", 12.0),
            grade("s1", "e1", 15.0),
            grade("s1", "e1", 25.0),
            grade("ghost", "e1", 10.0),
            grade("s1", "missing", 10.0),
        ];

        let validated = validate_snapshot(&snap, SubjectWeighting::Equal);
        assert_eq!(validated.subjects.len(), 1);
        assert_eq!(validated.exams.len(), 1);
        assert_eq!(validated.exams[0].id, "e1");
        assert_eq!(validated.grades.len(), 1);
        assert_eq!(validated.grades[0].value, 15.0);
        assert_eq!(validated.errors.len(), 3);
        assert!(validated
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::NonPositiveCoefficient { .. })));
        assert!(validated
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::UnknownSubject { .. })));
    }

    #[test]
    fn repeated_subject_counted_once() {
        let mut snap = snapshot();
        snap.subjects.push(Subject {
            name: "Mathématiques".into(),
            coefficient: 5,
        });

        let validated = validate_snapshot(&snap, SubjectWeighting::Equal);
        assert_eq!(validated.subjects.len(), 1);
        assert_eq!(validated.subjects[0].coefficient, 3);
        assert!(validated.warnings.contains(&DataQualityWarning::DuplicateSubject {
            subject: "Mathématiques".into(),
        }));
    }

    #[test]
    fn exam_coefficient_checked_only_when_weighting_by_exam() {
        let mut snap = snapshot();
        snap.subjects.push(Subject {
            name: "Musique".into(),
            coefficient: 1,
        });

        let equal = validate_snapshot(&snap, SubjectWeighting::Equal);
        assert!(equal.exams.iter().any(|e| e.id == "e3"));

        let weighted = validate_snapshot(&snap, SubjectWeighting::ExamCoefficient);
        assert!(!weighted.exams.iter().any(|e| e.id == "e3"));
        assert!(weighted
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::NonPositiveExamCoefficient { .. })));
    }

    #[test]
    fn foreign_class_exam_excluded() {
        let mut snap = snapshot();
        snap.exams[0].class_id = "CM1".into();
        let validated = validate_snapshot(&snap, SubjectWeighting::Equal);
        assert!(validated.exams.is_empty());
        assert!(matches!(
            validated.warnings[1],
            DataQualityWarning::ExamClassMismatch { .. }
        ));
    }
}
