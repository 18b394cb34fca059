//! Report card engine.
//!
//! [`evaluate_class`] is the pure pipeline for one (class, trimester):
//! validation, period filtering, subject aggregation, general averages,
//! ranking, mentions and assembly. [`ReportCardEngine`] wraps it with
//! repository access and runs several classes concurrently.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::aggregate::{general_average, SubjectAggregator};
use crate::assembler::{GenerationContext, ReportCardAssembler, StudentResult};
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::model::{Grade, GradeSnapshot, ReportCard, Student, SubjectAverage};
use crate::period::PeriodFilter;
use crate::ranking::{assign_ranks, rank_map};
use crate::report::ReportCardBatch;
use crate::statistics::{compute_class_statistics, compute_exam_statistics};
use crate::traits::GradeRepository;
use crate::validation::validate_snapshot;

/// One (class, trimester) to generate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassPeriod {
    pub class_id: String,
    pub trimester: u8,
}

impl ClassPeriod {
    pub fn new(class_id: impl Into<String>, trimester: u8) -> Self {
        Self {
            class_id: class_id.into(),
            trimester,
        }
    }
}

impl fmt::Display for ClassPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/T{}", self.class_id, self.trimester)
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_class_start(&self, request: &ClassPeriod);
    fn on_class_complete(&self, batch: &ReportCardBatch);
    fn on_class_error(&self, request: &ClassPeriod, error: &str);
    fn on_run_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_class_start(&self, _: &ClassPeriod) {}
    fn on_class_complete(&self, _: &ReportCardBatch) {}
    fn on_class_error(&self, _: &ClassPeriod, _: &str) {}
    fn on_run_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// A class that could not be generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub request: ClassPeriod,
    pub error: String,
}

/// Outcome of a multi-class run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    pub id: Uuid,
    /// Sorted by class, then trimester.
    pub batches: Vec<ReportCardBatch>,
    pub failures: Vec<GenerationFailure>,
    pub duration_ms: u64,
}

impl GenerationRun {
    pub fn report_card_count(&self) -> usize {
        self.batches.iter().map(|b| b.report_cards.len()).sum()
    }
}

/// Runs the pipeline against a validated configuration.
#[derive(Debug, Clone)]
pub struct ReportCardEngine {
    config: Arc<EngineConfig>,
    parallelism: usize,
}

impl ReportCardEngine {
    /// Fails before any computation if the configuration is unusable.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            parallelism: 4,
        })
    }

    /// Maximum number of classes generated concurrently.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a snapshot for one trimester.
    pub fn evaluate(
        &self,
        snapshot: &GradeSnapshot,
        trimester: u8,
        ctx: &GenerationContext,
    ) -> Result<ReportCardBatch, ConfigError> {
        evaluate_class(&self.config, snapshot, trimester, ctx)
    }

    /// Fetch one class from the repository and evaluate it.
    pub async fn generate(
        &self,
        repository: &dyn GradeRepository,
        request: &ClassPeriod,
        ctx: &GenerationContext,
    ) -> Result<ReportCardBatch> {
        let snapshot = repository
            .load_snapshot(&request.class_id, &self.config.school_year)
            .await
            .with_context(|| format!("failed to load snapshot for {request}"))?;
        let batch = self.evaluate(&snapshot, request.trimester, ctx)?;
        Ok(batch)
    }

    /// Generate several (class, trimester) batches concurrently.
    ///
    /// Each class is fetched and evaluated independently; a failing class
    /// is recorded in [`GenerationRun::failures`] without stopping the rest.
    pub async fn generate_many(
        &self,
        repository: Arc<dyn GradeRepository>,
        requests: &[ClassPeriod],
        ctx: &GenerationContext,
        progress: &dyn ProgressReporter,
    ) -> GenerationRun {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));

        let mut futures = FuturesUnordered::new();

        for request in requests {
            let repository = Arc::clone(&repository);
            let semaphore = Arc::clone(&semaphore);
            let config = Arc::clone(&self.config);
            let ctx = ctx.clone();
            let request = request.clone();

            progress.on_class_start(&request);
            futures.push(async move {
                let inner = async {
                    let _permit = semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

                    let snapshot = repository
                        .load_snapshot(&request.class_id, &config.school_year)
                        .await
                        .with_context(|| format!("failed to load snapshot for {request}"))?;

                    let trimester = request.trimester;
                    let batch = tokio::task::spawn_blocking(move || {
                        evaluate_class(&config, &snapshot, trimester, &ctx)
                    })
                    .await
                    .context("evaluation task panicked")??;
                    Ok::<_, anyhow::Error>(batch)
                };
                let result = inner.await;
                (request, result)
            });
        }

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        let total = futures.len();

        while let Some((request, result)) = futures.next().await {
            match result {
                Ok(batch) => {
                    progress.on_class_complete(&batch);
                    batches.push(batch);
                }
                Err(e) => {
                    tracing::error!("generation failed for {request}: {e:#}");
                    progress.on_class_error(&request, &format!("{e:#}"));
                    failures.push(GenerationFailure {
                        request,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        batches.sort_by(|a, b| {
            a.class_id
                .cmp(&b.class_id)
                .then_with(|| a.trimester.cmp(&b.trimester))
        });
        failures.sort_by(|a, b| a.request.cmp(&b.request));

        let elapsed = start.elapsed();
        progress.on_run_complete(total, batches.len(), failures.len(), elapsed);

        GenerationRun {
            id: run_id,
            batches,
            failures,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Run the full pipeline for one class and one trimester.
///
/// Pure apart from the batch run id: the report cards depend only on the
/// snapshot, the configuration and the context.
pub fn evaluate_class(
    config: &EngineConfig,
    snapshot: &GradeSnapshot,
    trimester: u8,
    ctx: &GenerationContext,
) -> Result<ReportCardBatch, ConfigError> {
    if config.trimester(trimester).is_none() {
        return Err(ConfigError::UnknownTrimester(trimester));
    }
    if snapshot.school_year != config.school_year {
        tracing::warn!(
            snapshot = %snapshot.school_year,
            configured = %config.school_year,
            "snapshot school year differs from the configured calendar"
        );
    }

    let validated = validate_snapshot(snapshot, config.subject_weighting);
    let selection = PeriodFilter::new(&config.trimesters).filter(
        trimester,
        validated.exams.iter().copied(),
        validated.grades.iter().copied(),
    );
    for warning in &selection.warnings {
        tracing::warn!("{warning}");
    }

    let aggregator = SubjectAggregator::new(
        config.rounding,
        config.subject_weighting,
        selection.exams.iter().copied(),
    );

    let mut by_student: HashMap<&str, Vec<&Grade>> = HashMap::new();
    for &grade in &selection.grades {
        by_student
            .entry(grade.student_id.as_str())
            .or_default()
            .push(grade);
    }

    let mut seen = HashSet::new();
    let students: Vec<&Student> = snapshot
        .students
        .iter()
        .filter(|s| seen.insert(s.id.as_str()))
        .collect();

    let mut results: Vec<(&Student, StudentResult)> = students
        .iter()
        .map(|&student| {
            let grades = by_student
                .get(student.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let subjects = aggregator.aggregate_student(&student.id, &validated.subjects, grades);
            let general = general_average(&subjects, &config.rounding);
            (
                student,
                StudentResult {
                    subjects,
                    general_average: general,
                    general_rank: None,
                    mention: None,
                },
            )
        })
        .collect();

    // Ranking needs every general average of the class.
    let ranked = assign_ranks(
        results.iter().map(|(student, result)| {
            let average = (!result.subjects.is_empty()).then_some(result.general_average);
            (student.id.as_str(), average)
        }),
        &config.rounding,
    );
    let ranks = rank_map(&ranked);

    let subject_ranks = if config.include_subject_ranks {
        rank_subjects(&results, config)
    } else {
        HashMap::new()
    };

    for (student, result) in results.iter_mut() {
        if result.subjects.is_empty() {
            continue;
        }
        result.general_rank = ranks.get(student.id.as_str()).copied();
        result.mention = Some(config.mentions.classify(result.general_average));
        for subject in result.subjects.iter_mut() {
            subject.rank = subject_ranks
                .get(&(subject.subject.clone(), student.id.clone()))
                .copied();
        }
    }

    let assembler = ReportCardAssembler {
        school_year: &config.school_year,
        class_id: &snapshot.class_id,
        trimester,
        default_remark: &config.default_remark,
        context: ctx,
    };
    let mut report_cards: Vec<ReportCard> = results
        .into_iter()
        .map(|(student, result)| assembler.assemble(student, result, ranked.len()))
        .collect();
    report_cards.sort_by(|a, b| {
        let a_rank = a.general_rank.unwrap_or(u32::MAX);
        let b_rank = b.general_rank.unwrap_or(u32::MAX);
        a_rank
            .cmp(&b_rank)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let mut statistics =
        compute_class_statistics(&report_cards, config.pass_mark, &config.rounding);
    statistics.exams = compute_exam_statistics(
        &selection.exams,
        &selection.grades,
        config.pass_mark,
        &config.rounding,
    );

    let mut warnings = validated.warnings;
    warnings.extend(selection.warnings);

    tracing::info!(
        class = %snapshot.class_id,
        trimester,
        cards = report_cards.len(),
        ranked = ranked.len(),
        rejected = validated.errors.len(),
        warnings = warnings.len(),
        "report cards generated"
    );

    Ok(ReportCardBatch {
        id: Uuid::new_v4(),
        class_id: snapshot.class_id.clone(),
        trimester,
        school_year: config.school_year.clone(),
        generated_on: ctx.generated_on,
        report_cards,
        statistics,
        validation_errors: validated.errors,
        warnings,
    })
}

/// Rank every subject across the students who have an average in it.
fn rank_subjects(
    results: &[(&Student, StudentResult)],
    config: &EngineConfig,
) -> HashMap<(String, String), u32> {
    let mut per_subject: Vec<(&str, Vec<(&str, Option<f64>)>)> = Vec::new();
    for (student, result) in results {
        for SubjectAverage { subject, average, .. } in &result.subjects {
            let entry = (student.id.as_str(), Some(*average));
            match per_subject.iter_mut().find(|(name, _)| *name == subject.as_str()) {
                Some((_, entries)) => entries.push(entry),
                None => per_subject.push((subject.as_str(), vec![entry])),
            }
        }
    }

    let mut ranks = HashMap::new();
    for (subject, entries) in per_subject {
        for entry in assign_ranks(entries, &config.rounding) {
            ranks.insert((subject.to_string(), entry.student_id), entry.rank);
        }
    }
    ranks
}
