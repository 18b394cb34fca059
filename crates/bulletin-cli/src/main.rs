//! bulletin CLI: computes school report cards from a grade dataset.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "bulletin",
    version,
    about = "Report card engine: averages, ranks and mentions per trimester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate report cards for one or more classes.
    Generate {
        /// Comma-separated class ids. Defaults to every class in the dataset.
        #[arg(long)]
        class: Option<String>,

        /// Comma-separated trimester numbers.
        #[arg(long, default_value = "1")]
        trimester: String,

        /// Path to bulletin.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Dataset file, overriding the configured one.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Output directory, overriding the configured one.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, all.
        #[arg(long, default_value = "json")]
        format: String,

        /// General remark printed on every report card.
        #[arg(long)]
        remark: Option<String>,

        /// Generation date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Max classes generated concurrently.
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Check a dataset for rejected grades and data-quality problems.
    Validate {
        /// Dataset file or directory of datasets.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Path to bulletin.toml; its engine section is validated too.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exit with an error when any grade is rejected.
        #[arg(long)]
        strict: bool,
    },

    /// Compare two generated batches of the same class and trimester.
    Compare {
        /// Baseline batch JSON.
        #[arg(long)]
        baseline: PathBuf,

        /// Current batch JSON.
        #[arg(long)]
        current: PathBuf,

        /// Exit with code 1 if any report card changed.
        #[arg(long)]
        fail_on_change: bool,

        /// Output format: text, json, markdown.
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the classes of a dataset.
    Classes {
        /// Dataset file, overriding the configured one.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Path to bulletin.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a sample bulletin.toml and dataset.
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                "bulletin=info"
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            class,
            trimester,
            config,
            dataset,
            output,
            format,
            remark,
            date,
            parallelism,
        } => {
            commands::generate::execute(commands::generate::GenerateArgs {
                classes: class,
                trimesters: trimester,
                config_path: config,
                dataset,
                output,
                format,
                remark,
                date,
                parallelism,
            })
            .await
        }
        Commands::Validate {
            dataset,
            config,
            strict,
        } => commands::validate::execute(dataset, config, strict),
        Commands::Compare {
            baseline,
            current,
            fail_on_change,
            format,
        } => commands::compare::execute(baseline, current, fail_on_change, format),
        Commands::Classes { dataset, config } => commands::classes::execute(dataset, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
