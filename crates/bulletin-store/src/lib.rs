//! bulletin-store: grade repositories and report card sinks.
//!
//! Implements the `GradeRepository` and `ReportCardSink` collaborator traits
//! of `bulletin-core` over dataset files, memory and JSON directories, and
//! loads the application configuration.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod sink;

pub use config::{load_config_from, BulletinConfig, StoreSettings};
pub use error::StoreError;
pub use file::FileRepository;
pub use memory::{InMemoryRepository, InMemorySink};
pub use sink::JsonDirectorySink;
