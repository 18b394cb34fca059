//! The `bulletin compare` command.

use std::path::PathBuf;

use anyhow::Result;

use bulletin_core::mention::Mention;
use bulletin_core::report::ReportCardBatch;

fn rank_text(rank: Option<u32>) -> String {
    rank.map(|r| format!("#{r}"))
        .unwrap_or_else(|| "unranked".to_string())
}

fn mention_text(mention: Option<Mention>) -> String {
    mention
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    fail_on_change: bool,
    format: String,
) -> Result<()> {
    let baseline = ReportCardBatch::load_json(&baseline_path)?;
    let current = ReportCardBatch::load_json(&current_path)?;

    if baseline.class_id != current.class_id || baseline.trimester != current.trimester {
        eprintln!(
            "Warning: comparing {}/T{} against {}/T{}",
            current.class_id, current.trimester, baseline.class_id, baseline.trimester
        );
    }

    let report = current.compare(&baseline);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            // text format
            println!(
                "Comparison: {} changed, {} unchanged, {} added, {} removed",
                report.changes.len(),
                report.unchanged,
                report.added.len(),
                report.removed.len()
            );

            if !report.changes.is_empty() {
                println!("\nChanges:");
                for c in &report.changes {
                    println!(
                        "  {} ({}) {:.2} -> {:.2} ({:+.2}), {} -> {}, {} -> {}",
                        c.student_name,
                        c.student_id,
                        c.baseline_average,
                        c.current_average,
                        c.delta(),
                        rank_text(c.baseline_rank),
                        rank_text(c.current_rank),
                        mention_text(c.baseline_mention),
                        mention_text(c.current_mention),
                    );
                }
            }

            if !report.added.is_empty() {
                println!("\n{} new student(s): {}", report.added.len(), report.added.join(", "));
            }
            if !report.removed.is_empty() {
                println!(
                    "{} removed student(s): {}",
                    report.removed.len(),
                    report.removed.join(", ")
                );
            }
        }
    }

    if fail_on_change && report.has_changes() {
        std::process::exit(1);
    }

    Ok(())
}
