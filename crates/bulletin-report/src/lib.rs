//! bulletin-report: rendering of report card batches.
//!
//! Produces self-contained HTML bulletins. Rendering only reads the finished
//! batch; nothing here feeds back into the engine.

pub mod html;

pub use html::{generate_html, write_html_report};
