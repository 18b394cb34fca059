//! Collaborator traits.
//!
//! The engine reads snapshots through a [`GradeRepository`] and hands
//! finished batches to a [`ReportCardSink`]. Both are implemented by the
//! `bulletin-store` crate; the engine never touches storage directly.

use async_trait::async_trait;

use crate::model::GradeSnapshot;
use crate::report::ReportCardBatch;

/// Source of immutable grade snapshots.
#[async_trait]
pub trait GradeRepository: Send + Sync {
    /// Human-readable repository name (e.g. "file").
    fn name(&self) -> &str;

    /// Snapshot of one class for one school year.
    async fn load_snapshot(&self, class_id: &str, school_year: &str)
        -> anyhow::Result<GradeSnapshot>;

    /// Classes known for a school year, sorted.
    async fn list_classes(&self, school_year: &str) -> anyhow::Result<Vec<String>>;
}

/// Destination for finished batches.
///
/// Storing a batch for a (class, trimester) that already has one replaces
/// the previous batch.
#[async_trait]
pub trait ReportCardSink: Send + Sync {
    fn name(&self) -> &str;

    async fn store(&self, batch: &ReportCardBatch) -> anyhow::Result<()>;
}
