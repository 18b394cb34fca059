//! The `bulletin init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create bulletin.toml
    if std::path::Path::new("bulletin.toml").exists() {
        println!("bulletin.toml already exists, skipping.");
    } else {
        std::fs::write("bulletin.toml", SAMPLE_CONFIG)?;
        println!("Created bulletin.toml");
    }

    // Create sample dataset
    let dataset_path = std::path::Path::new("dataset.json");
    if dataset_path.exists() {
        println!("dataset.json already exists, skipping.");
    } else {
        std::fs::write(dataset_path, SAMPLE_DATASET)?;
        println!("Created dataset.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit bulletin.toml with your school calendar");
    println!("  2. Run: bulletin validate --config bulletin.toml");
    println!("  3. Run: bulletin generate --config bulletin.toml --trimester 1 --format all");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# bulletin configuration

parallelism = 4

[store]
dataset = "dataset.json"
output_dir = "bulletins"

[engine]
school_year = "2024-2025"
pass_mark = 10.0
# "equal" or "exam_coefficient"
subject_weighting = "equal"
include_subject_ranks = true
default_remark = "Appréciation générale générée automatiquement."

[engine.rounding]
# "half_up", "half_even" or "down"
mode = "half_up"
decimals = 1

# Half-open windows: start inclusive, end exclusive.
[[engine.trimesters]]
number = 1
start = "2024-09-01"
end = "2025-01-01"

[[engine.trimesters]]
number = 2
start = "2025-01-01"
end = "2025-04-01"

[[engine.trimesters]]
number = 3
start = "2025-04-01"
end = "2025-07-15"

# Highest threshold first; each lower bound is inclusive.
[[engine.mentions]]
min = 16.0
mention = "Très Bien"

[[engine.mentions]]
min = 14.0
mention = "Bien"

[[engine.mentions]]
min = 12.0
mention = "Assez Bien"

[[engine.mentions]]
min = 10.0
mention = "Passable"

[[engine.mentions]]
min = 0.0
mention = "Insuffisant"
"#;

const SAMPLE_DATASET: &str = r#"{
  "school_year": "2024-2025",
  "students": [
    {"id": "s1", "first_name": "Awa", "last_name": "Diop", "class_id": "CM2"},
    {"id": "s2", "first_name": "Moussa", "last_name": "Sow", "class_id": "CM2"}
  ],
  "subjects": [
    {"name": "Mathématiques", "coefficient": 3},
    {"name": "Français", "coefficient": 2}
  ],
  "exams": [
    {"id": "math-c1", "type": "composition", "subject": "Mathématiques", "class_id": "CM2", "date": "2024-10-15"},
    {"id": "fr-c1", "type": "composition", "subject": "Français", "class_id": "CM2", "date": "2024-10-22"},
    {"id": "math-t1", "type": "trimester_exam", "subject": "Mathématiques", "class_id": "CM2", "date": "2024-12-16", "period": 1}
  ],
  "grades": [
    {"student_id": "s1", "exam_id": "math-c1", "value": 15.5},
    {"student_id": "s1", "exam_id": "fr-c1", "value": 13.0, "remark": "Bon travail"},
    {"student_id": "s1", "exam_id": "math-t1", "value": 16.0},
    {"student_id": "s2", "exam_id": "math-c1", "value": 11.0},
    {"student_id": "s2", "exam_id": "fr-c1", "value": 12.5},
    {"student_id": "s2", "exam_id": "math-t1", "value": 9.5}
  ]
}
"#;
