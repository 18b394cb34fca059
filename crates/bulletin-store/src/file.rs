//! Dataset-file repository.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use bulletin_core::model::GradeSnapshot;
use bulletin_core::parser::{parse_dataset_str, DatasetFormat, SchoolDataset};
use bulletin_core::traits::GradeRepository;

use crate::error::StoreError;

/// Repository backed by a single JSON or TOML dataset file.
///
/// The file is re-read on every call, so regenerating after grades were
/// edited always sees the current data.
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
    format: DatasetFormat,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = DatasetFormat::from_path(&path)
            .ok_or_else(|| StoreError::UnsupportedFormat(path.display().to_string()))?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole dataset.
    pub async fn load_dataset(&self) -> Result<SchoolDataset> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read dataset file: {}", self.path.display()))?;
        parse_dataset_str(&content, self.format, &self.path)
    }

    async fn dataset_for(&self, school_year: &str) -> Result<SchoolDataset> {
        let dataset = self.load_dataset().await?;
        if dataset.school_year != school_year {
            return Err(StoreError::SchoolYearMismatch {
                expected: school_year.to_string(),
                found: dataset.school_year,
            }
            .into());
        }
        Ok(dataset)
    }
}

#[async_trait]
impl GradeRepository for FileRepository {
    fn name(&self) -> &str {
        "file"
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_snapshot(&self, class_id: &str, school_year: &str) -> Result<GradeSnapshot> {
        let dataset = self.dataset_for(school_year).await?;
        if !dataset.class_ids().iter().any(|c| c == class_id) {
            return Err(StoreError::ClassNotFound {
                class_id: class_id.to_string(),
                school_year: school_year.to_string(),
            }
            .into());
        }
        let snapshot = dataset.snapshot_for(class_id);
        tracing::debug!(
            students = snapshot.students.len(),
            exams = snapshot.exams.len(),
            grades = snapshot.grades.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn list_classes(&self, school_year: &str) -> Result<Vec<String>> {
        Ok(self.dataset_for(school_year).await?.class_ids())
    }
}
