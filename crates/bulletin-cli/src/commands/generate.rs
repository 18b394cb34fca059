//! The `bulletin generate` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use bulletin_core::assembler::GenerationContext;
use bulletin_core::engine::{ClassPeriod, GenerationRun, ProgressReporter, ReportCardEngine};
use bulletin_core::report::ReportCardBatch;
use bulletin_core::traits::ReportCardSink;
use bulletin_report::write_html_report;

use super::{load_settings, split_list};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_class_start(&self, request: &ClassPeriod) {
        eprintln!("  Starting: {request}");
    }

    fn on_class_complete(&self, batch: &ReportCardBatch) {
        let rejected = if batch.validation_errors.is_empty() {
            String::new()
        } else {
            format!(", {} rejected grade(s)", batch.validation_errors.len())
        };
        eprintln!(
            "  Done: {}/T{} {} report card(s){}",
            batch.class_id,
            batch.trimester,
            batch.report_cards.len(),
            rejected,
        );
    }

    fn on_class_error(&self, request: &ClassPeriod, error: &str) {
        eprintln!("  ERROR: {request}: {error}");
    }

    fn on_run_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {completed}/{total} succeeded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub struct GenerateArgs {
    pub classes: Option<String>,
    pub trimesters: String,
    pub config_path: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub remark: Option<String>,
    pub date: Option<NaiveDate>,
    pub parallelism: Option<usize>,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let mut config = load_settings(args.config_path.as_deref(), args.dataset)?;
    if let Some(output) = args.output {
        config.store.output_dir = output;
    }

    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let engine_config = config
        .engine_config()
        .context("invalid [engine] configuration")?;
    let engine = ReportCardEngine::new(engine_config)?.with_parallelism(parallelism);
    let school_year = engine.config().school_year.clone();

    // Parse trimesters
    let trimesters: Vec<u8> = split_list(&args.trimesters)
        .iter()
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| anyhow::anyhow!("invalid trimester: '{s}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(!trimesters.is_empty(), "at least one trimester is required");
    for &number in &trimesters {
        anyhow::ensure!(
            engine.config().trimester(number).is_some(),
            "trimester {number} is not configured for {school_year}"
        );
    }

    let repository = config.open_repository()?;

    let classes = match &args.classes {
        Some(list) => split_list(list),
        None => repository.list_classes(&school_year).await?,
    };
    anyhow::ensure!(!classes.is_empty(), "no classes to generate");

    let requests: Vec<ClassPeriod> = classes
        .iter()
        .flat_map(|class_id| {
            trimesters
                .iter()
                .map(move |&trimester| ClassPeriod::new(class_id.clone(), trimester))
        })
        .collect();

    let mut ctx = match args.date {
        Some(date) => GenerationContext::new(date),
        None => GenerationContext::today(),
    };
    if let Some(remark) = args.remark {
        ctx = ctx.with_general_remark(remark);
    }

    eprintln!(
        "bulletin v{}: generating {} class(es) x {} trimester(s) for {}",
        env!("CARGO_PKG_VERSION"),
        classes.len(),
        trimesters.len(),
        school_year
    );
    eprintln!();

    let run = engine
        .generate_many(repository, &requests, &ctx, &ConsoleReporter)
        .await;

    print_summary(&run);

    let formats: Vec<&str> = if args.format == "all" {
        vec!["json", "html"]
    } else {
        args.format.split(',').map(|s| s.trim()).collect()
    };

    let sink = config.open_sink();
    for batch in &run.batches {
        for fmt in &formats {
            match *fmt {
                "json" => {
                    sink.store(batch).await?;
                    let path = sink.path_for(&batch.school_year, &batch.class_id, batch.trimester);
                    eprintln!("Bulletins saved to: {}", path.display());
                }
                "html" => {
                    let path = sink
                        .path_for(&batch.school_year, &batch.class_id, batch.trimester)
                        .with_extension("html");
                    write_html_report(batch, &path)?;
                    eprintln!("HTML report: {}", path.display());
                }
                _ => {
                    eprintln!("Unknown format: {fmt}");
                }
            }
        }
    }

    if !run.failures.is_empty() {
        anyhow::bail!(
            "{} of {} class(es) failed: {}",
            run.failures.len(),
            requests.len(),
            run.failures
                .iter()
                .map(|f| f.request.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

fn print_summary(run: &GenerationRun) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Class",
        "Trimester",
        "Students",
        "Evaluated",
        "Class avg",
        "Pass rate",
        "Top",
    ]);

    for batch in &run.batches {
        let stats = &batch.statistics;
        let top = batch
            .report_cards
            .iter()
            .filter(|c| c.general_rank == Some(1))
            .map(|c| c.student_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&batch.class_id),
            Cell::new(format!("T{}", batch.trimester)),
            Cell::new(batch.report_cards.len()),
            Cell::new(stats.evaluated),
            Cell::new(
                stats
                    .class_average
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(
                stats
                    .pass_rate
                    .map(|p| format!("{p}%"))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(top),
        ]);
    }

    eprintln!("\n{table}");
}
