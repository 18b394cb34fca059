//! bulletin-core: report card engine, collaborator traits and data model.
//!
//! Turns per-exam grades into subject averages, a coefficient-weighted
//! general average, a class rank and a mention, then assembles one report
//! card per student. The pipeline is a pure function of its input snapshot.

pub mod aggregate;
pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod mention;
pub mod model;
pub mod parser;
pub mod period;
pub mod ranking;
pub mod report;
pub mod statistics;
pub mod traits;
pub mod validation;
