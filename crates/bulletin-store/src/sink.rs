//! JSON directory sink.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use bulletin_core::report::ReportCardBatch;
use bulletin_core::traits::ReportCardSink;

/// Writes batches to `<root>/<school_year>/<class>-T<n>.json`.
///
/// A batch for the same (class, trimester) overwrites the previous file.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    root: PathBuf,
}

fn file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

impl JsonDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, school_year: &str, class_id: &str, trimester: u8) -> PathBuf {
        self.root
            .join(file_component(school_year))
            .join(format!("{}-T{trimester}.json", file_component(class_id)))
    }

    /// Load the stored batch for a (class, trimester), if any.
    pub async fn load(
        &self,
        school_year: &str,
        class_id: &str,
        trimester: u8,
    ) -> Result<Option<ReportCardBatch>> {
        let path = self.path_for(school_year, class_id, trimester);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read batch from {}", path.display()))?;
        let batch = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse batch JSON: {}", path.display()))?;
        Ok(Some(batch))
    }
}

#[async_trait]
impl ReportCardSink for JsonDirectorySink {
    fn name(&self) -> &str {
        "json"
    }

    async fn store(&self, batch: &ReportCardBatch) -> Result<()> {
        let path = self.path_for(&batch.school_year, &batch.class_id, batch.trimester);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(batch).context("failed to serialize batch")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write batch to {}", path.display()))?;
        tracing::info!(path = %path.display(), "batch stored");
        Ok(())
    }
}
