//! The `bulletin classes` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use bulletin_core::parser;

use super::load_settings;

pub fn execute(dataset: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_settings(config_path.as_deref(), dataset)?;
    let dataset = parser::parse_dataset(&config.store.dataset)?;

    let mut table = Table::new();
    table.set_header(vec!["Class", "Students", "Exams", "Grades"]);

    let classes = dataset.class_ids();
    for class_id in &classes {
        let snapshot = dataset.snapshot_for(class_id);
        table.add_row(vec![
            Cell::new(class_id),
            Cell::new(snapshot.students.len()),
            Cell::new(snapshot.exams.len()),
            Cell::new(snapshot.grades.len()),
        ]);
    }

    println!("School year {}: {} class(es)", dataset.school_year, classes.len());
    println!("{table}");

    Ok(())
}
