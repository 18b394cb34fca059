//! Store error types.

use thiserror::Error;

/// Errors raised by repositories and sinks.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No student or exam of the dataset belongs to the class.
    #[error("class '{class_id}' not found for school year {school_year}")]
    ClassNotFound {
        class_id: String,
        school_year: String,
    },

    /// The dataset covers another school year than the one requested.
    #[error("dataset is for school year {found}, requested {expected}")]
    SchoolYearMismatch { expected: String, found: String },

    /// The dataset file extension is neither `.json` nor `.toml`.
    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed dataset: {0}")]
    Malformed(String),
}
