//! School dataset parsing.
//!
//! A dataset holds one school year's students, subjects, exams and grades
//! across every class, as JSON or TOML. Snapshots for a single class are
//! cut from it with [`SchoolDataset::snapshot_for`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Exam, Grade, GradeSnapshot, Student, Subject};

/// All records of one school year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolDataset {
    pub school_year: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl SchoolDataset {
    /// Every class referenced by a student or an exam, sorted.
    pub fn class_ids(&self) -> Vec<String> {
        self.students
            .iter()
            .map(|s| s.class_id.as_str())
            .chain(self.exams.iter().map(|e| e.class_id.as_str()))
            .filter(|c| !c.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Snapshot of one class.
    ///
    /// Keeps the class's students and exams, every subject, and each grade
    /// whose student or exam belongs to the class, so that references to
    /// missing records still surface as validation errors. Grades linking a
    /// student and an exam of two different classes are left out of every
    /// snapshot; [`validate_dataset`] reports them once.
    pub fn snapshot_for(&self, class_id: &str) -> GradeSnapshot {
        let students: Vec<Student> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect();
        let exams: Vec<Exam> = self
            .exams
            .iter()
            .filter(|e| e.class_id == class_id)
            .cloned()
            .collect();

        let student_ids: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
        let exam_ids: HashSet<&str> = exams.iter().map(|e| e.id.as_str()).collect();
        let grades = self
            .grades
            .iter()
            .filter(|g| {
                student_ids.contains(g.student_id.as_str()) || exam_ids.contains(g.exam_id.as_str())
            })
            .filter(|g| {
                let crossing = self.cross_class(g).is_some();
                if crossing {
                    tracing::warn!(
                        student = %g.student_id,
                        exam = %g.exam_id,
                        "grade links two classes, left out of the snapshot"
                    );
                }
                !crossing
            })
            .cloned()
            .collect();

        GradeSnapshot {
            school_year: self.school_year.clone(),
            class_id: class_id.to_string(),
            students,
            subjects: self.subjects.clone(),
            exams,
            grades,
        }
    }

    /// The (student class, exam class) pair of a grade whose student and
    /// exam both exist but belong to different classes.
    pub fn cross_class<'a>(&'a self, grade: &Grade) -> Option<(&'a str, &'a str)> {
        let student = self.students.iter().find(|s| s.id == grade.student_id)?;
        let exam = self.exams.iter().find(|e| e.id == grade.exam_id)?;
        (student.class_id != exam.class_id)
            .then_some((student.class_id.as_str(), exam.class_id.as_str()))
    }
}

/// On-disk dataset encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Json,
    Toml,
}

impl DatasetFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(DatasetFormat::Json),
            "toml" => Some(DatasetFormat::Toml),
            _ => None,
        }
    }
}

/// Parse a dataset file, JSON or TOML by extension.
pub fn parse_dataset(path: &Path) -> Result<SchoolDataset> {
    let format = DatasetFormat::from_path(path)
        .with_context(|| format!("unsupported dataset extension: {}", path.display()))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file: {}", path.display()))?;

    parse_dataset_str(&content, format, path)
}

/// Parse a dataset from a string (useful for testing).
pub fn parse_dataset_str(
    content: &str,
    format: DatasetFormat,
    source_path: &Path,
) -> Result<SchoolDataset> {
    let dataset: SchoolDataset = match format {
        DatasetFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?,
        DatasetFormat::Toml => toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?,
    };

    if dataset.school_year.trim().is_empty() {
        anyhow::bail!("dataset has no school_year: {}", source_path.display());
    }

    Ok(dataset)
}

/// Recursively load all `.json` and `.toml` datasets from a directory.
pub fn load_dataset_directory(dir: &Path) -> Result<Vec<SchoolDataset>> {
    let mut datasets = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            datasets.extend(load_dataset_directory(&path)?);
        } else if DatasetFormat::from_path(&path).is_some() {
            match parse_dataset(&path) {
                Ok(dataset) => datasets.push(dataset),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(datasets)
}

/// A structural problem in a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetWarning {
    /// The offending record id (if applicable).
    pub record: Option<String>,
    pub message: String,
}

/// Check a dataset for structural issues the engine would silently absorb.
pub fn validate_dataset(dataset: &SchoolDataset) -> Vec<DatasetWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for student in &dataset.students {
        if !seen.insert(student.id.as_str()) {
            warnings.push(DatasetWarning {
                record: Some(student.id.clone()),
                message: format!("duplicate student ID: {}", student.id),
            });
        }
        if student.class_id.trim().is_empty() {
            warnings.push(DatasetWarning {
                record: Some(student.id.clone()),
                message: "student has no class".into(),
            });
        }
    }

    let mut seen = HashSet::new();
    for exam in &dataset.exams {
        if !seen.insert(exam.id.as_str()) {
            warnings.push(DatasetWarning {
                record: Some(exam.id.clone()),
                message: format!("duplicate exam ID: {}", exam.id),
            });
        }
    }

    let mut seen = HashSet::new();
    for subject in &dataset.subjects {
        if !seen.insert(subject.name.as_str()) {
            warnings.push(DatasetWarning {
                record: Some(subject.name.clone()),
                message: format!("duplicate subject: {}", subject.name),
            });
        }
    }

    let student_classes: HashMap<&str, &str> = dataset
        .students
        .iter()
        .map(|s| (s.id.as_str(), s.class_id.as_str()))
        .collect();
    let exam_classes: HashMap<&str, &str> = dataset
        .exams
        .iter()
        .map(|e| (e.id.as_str(), e.class_id.as_str()))
        .collect();
    for grade in &dataset.grades {
        let (Some(&student_class), Some(&exam_class)) = (
            student_classes.get(grade.student_id.as_str()),
            exam_classes.get(grade.exam_id.as_str()),
        ) else {
            continue;
        };
        if student_class != exam_class {
            warnings.push(DatasetWarning {
                record: Some(grade.student_id.clone()),
                message: format!(
                    "grade on exam '{}' ({exam_class}) belongs to a student of {student_class}",
                    grade.exam_id
                ),
            });
        }
    }

    if dataset.students.is_empty() {
        warnings.push(DatasetWarning {
            record: None,
            message: "dataset has no students".into(),
        });
    }

    warnings
}
