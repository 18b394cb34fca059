//! The `bulletin validate` command.

use std::path::PathBuf;

use anyhow::Result;

use bulletin_core::parser;
use bulletin_core::period::{check_exam_dates, PeriodFilter};
use bulletin_core::validation::validate_snapshot;

use super::load_settings;

pub fn execute(dataset: Option<PathBuf>, config_path: Option<PathBuf>, strict: bool) -> Result<()> {
    let config = load_settings(config_path.as_deref(), dataset)?;

    // Only an explicit config is held to the full engine requirements.
    let engine = if config_path.is_some() {
        let engine = config.engine_config()?;
        println!(
            "Configuration: school year {} ({} trimester(s), {} mention band(s))",
            engine.school_year,
            engine.trimesters.len(),
            engine.mentions.bands().len()
        );
        Some(engine)
    } else {
        config.engine_config().ok()
    };

    let path = &config.store.dataset;
    let datasets = if path.is_dir() {
        parser::load_dataset_directory(path)?
    } else {
        vec![parser::parse_dataset(path)?]
    };

    let weighting = config.engine.subject_weighting;
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for dataset in &datasets {
        println!(
            "Dataset: {} ({} students, {} exams, {} grades)",
            dataset.school_year,
            dataset.students.len(),
            dataset.exams.len(),
            dataset.grades.len()
        );

        let warnings = parser::validate_dataset(dataset);
        for w in &warnings {
            let prefix = w
                .record
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();

        for class_id in dataset.class_ids() {
            let snapshot = dataset.snapshot_for(&class_id);
            let validated = validate_snapshot(&snapshot, weighting);
            println!(
                "  Class {class_id}: {} students, {} usable grades",
                snapshot.students.len(),
                validated.grades.len()
            );
            for e in &validated.errors {
                println!("    ERROR: {e}");
            }
            // Without a calendar, exam dates can only be checked for format.
            let date_warnings = match &engine {
                Some(engine) => PeriodFilter::new(&engine.trimesters).check(&snapshot.exams),
                None => check_exam_dates(&snapshot.exams),
            };
            for w in validated.warnings.iter().chain(&date_warnings) {
                println!("    WARNING: {w}");
            }
            total_errors += validated.errors.len();
            total_warnings += validated.warnings.len() + date_warnings.len();
        }
    }

    if total_errors == 0 && total_warnings == 0 {
        println!("All datasets valid.");
    } else {
        println!("\n{total_errors} error(s), {total_warnings} warning(s) found.");
    }

    if strict && total_errors > 0 {
        anyhow::bail!("{total_errors} grade(s) rejected");
    }

    Ok(())
}
