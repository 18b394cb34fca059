//! Report card batches with JSON persistence and recompute comparison.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DataQualityWarning, ValidationError};
use crate::mention::Mention;
use crate::model::ReportCard;
use crate::statistics::ClassStatistics;

/// Every report card of one (class, trimester), plus what was set aside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCardBatch {
    /// Unique run identifier; not part of the comparable payload.
    pub id: Uuid,
    pub class_id: String,
    pub trimester: u8,
    pub school_year: String,
    pub generated_on: NaiveDate,
    /// Sorted by rank, then student id; unranked students last.
    pub report_cards: Vec<ReportCard>,
    pub statistics: ClassStatistics,
    /// Grade records rejected at the input boundary.
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
    /// Records excluded from computation.
    #[serde(default)]
    pub warnings: Vec<DataQualityWarning>,
}

impl ReportCardBatch {
    /// Save the batch as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize batch")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write batch to {}", path.display()))?;
        Ok(())
    }

    /// Load a batch from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read batch from {}", path.display()))?;
        let batch: ReportCardBatch =
            serde_json::from_str(&content).context("failed to parse batch JSON")?;
        Ok(batch)
    }

    /// Look up a student's card.
    pub fn card(&self, student_id: &str) -> Option<&ReportCard> {
        self.report_cards.iter().find(|c| c.student_id == student_id)
    }

    /// True when both batches hold the same cards, ignoring run id and
    /// generation dates.
    pub fn same_payload(&self, other: &ReportCardBatch) -> bool {
        self.class_id == other.class_id
            && self.trimester == other.trimester
            && self.school_year == other.school_year
            && self.report_cards == other.report_cards
            && self.statistics == other.statistics
            && self.validation_errors == other.validation_errors
            && self.warnings == other.warnings
    }

    /// Compare this batch against a previous one for the same class.
    pub fn compare(&self, baseline: &ReportCardBatch) -> ChangeReport {
        let previous: HashMap<&str, &ReportCard> = baseline
            .report_cards
            .iter()
            .map(|c| (c.student_id.as_str(), c))
            .collect();

        let mut changes = Vec::new();
        let mut unchanged = 0usize;
        let mut added = Vec::new();

        for card in &self.report_cards {
            let Some(before) = previous.get(card.student_id.as_str()) else {
                added.push(card.student_id.clone());
                continue;
            };
            if before.general_average == card.general_average
                && before.general_rank == card.general_rank
                && before.mention == card.mention
                && before.status == card.status
            {
                unchanged += 1;
                continue;
            }
            changes.push(StudentChange {
                student_id: card.student_id.clone(),
                student_name: card.student_name.clone(),
                baseline_average: before.general_average,
                current_average: card.general_average,
                baseline_rank: before.general_rank,
                current_rank: card.general_rank,
                baseline_mention: before.mention,
                current_mention: card.mention,
            });
        }

        let current: HashSet<&str> = self
            .report_cards
            .iter()
            .map(|c| c.student_id.as_str())
            .collect();
        let removed = baseline
            .report_cards
            .iter()
            .filter(|c| !current.contains(c.student_id.as_str()))
            .map(|c| c.student_id.clone())
            .collect();

        ChangeReport {
            changes,
            unchanged,
            added,
            removed,
        }
    }
}

/// Result of comparing two batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Students whose average, rank, mention or status changed.
    pub changes: Vec<StudentChange>,
    pub unchanged: usize,
    /// Students in the current batch only.
    pub added: Vec<String>,
    /// Students in the baseline only.
    pub removed: Vec<String>,
}

/// One student's change between two batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentChange {
    pub student_id: String,
    pub student_name: String,
    pub baseline_average: f64,
    pub current_average: f64,
    pub baseline_rank: Option<u32>,
    pub current_rank: Option<u32>,
    pub baseline_mention: Option<Mention>,
    pub current_mention: Option<Mention>,
}

impl StudentChange {
    pub fn delta(&self) -> f64 {
        self.current_average - self.baseline_average
    }
}

fn rank_cell(rank: Option<u32>) -> String {
    rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
}

fn mention_cell(mention: Option<Mention>) -> String {
    mention
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl ChangeReport {
    /// Format the change report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} changed, {} unchanged, {} added, {} removed\n\n",
            self.changes.len(),
            self.unchanged,
            self.added.len(),
            self.removed.len()
        ));

        if !self.changes.is_empty() {
            md.push_str("### Changes\n\n");
            md.push_str("| Student | Average | Rank | Mention |\n");
            md.push_str("|---------|---------|------|---------|\n");
            for c in &self.changes {
                md.push_str(&format!(
                    "| {} | {:.1} → {:.1} ({:+.1}) | {} → {} | {} → {} |\n",
                    c.student_name,
                    c.baseline_average,
                    c.current_average,
                    c.delta(),
                    rank_cell(c.baseline_rank),
                    rank_cell(c.current_rank),
                    mention_cell(c.baseline_mention),
                    mention_cell(c.current_mention),
                ));
            }
            md.push('\n');
        }

        if !self.added.is_empty() {
            md.push_str(&format!("**Added:** {}\n\n", self.added.join(", ")));
        }
        if !self.removed.is_empty() {
            md.push_str(&format!("**Removed:** {}\n", self.removed.join(", ")));
        }

        md
    }

    /// Returns true if anything changed.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }
}
