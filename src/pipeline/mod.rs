//! Batch pipeline: analyze, judge, log, repeat.
//!
//! Problems are processed in fixed-size chunks. Each chunk is analyzed,
//! judged, and appended to the run log before the next one starts, so a
//! crash loses at most the chunk in progress.

use crate::agent::{AnalysisInvoker, ItemError};
use crate::analysis::summarize_batches;
use crate::judge::AlignmentJudge;
use crate::models::{BatchReport, FailedProblem, ItemOutcome, Problem, RunSummary, ScoredResult};
use crate::report::{generate_batch_section, generate_summary_section, RunLog};
use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Problems per chunk.
    pub chunk_size: usize,
    /// Record failed requests per problem instead of aborting the run.
    pub isolate_failures: bool,
    /// Directory that receives the run log.
    pub log_dir: PathBuf,
    /// Print progress to the console.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            isolate_failures: false,
            log_dir: PathBuf::from("logs"),
            show_progress: true,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub log_path: PathBuf,
    pub batches: Vec<BatchReport>,
    pub summary: RunSummary,
}

/// Runs the invoker and the judge over a problem set.
pub struct BatchPipeline {
    invoker: AnalysisInvoker,
    judge: AlignmentJudge,
    config: PipelineConfig,
}

impl BatchPipeline {
    pub fn new(invoker: AnalysisInvoker, judge: AlignmentJudge, config: PipelineConfig) -> Self {
        Self {
            invoker,
            judge,
            config,
        }
    }

    /// Process every problem and write the log. Returns the run outcome.
    pub async fn run(&self, problems: &[Problem]) -> Result<RunOutcome> {
        let log = RunLog::create(&self.config.log_dir, Local::now(), problems.len())?;
        info!(
            "Running {} problems in chunks of {} (log: {})",
            problems.len(),
            self.config.chunk_size,
            log.path().display()
        );

        let progress = self.progress_bar(problems.len());
        let mut batches = Vec::new();

        for (i, chunk) in problems.chunks(self.config.chunk_size.max(1)).enumerate() {
            let batch_index = i + 1;
            self.say(
                &progress,
                format!("Processing batch {} with {} problems...", batch_index, chunk.len()),
            );

            let batch = self
                .process_batch(batch_index, chunk)
                .await
                .with_context(|| format!("Batch {} failed", batch_index))?;

            log.append(&generate_batch_section(&batch))?;
            progress.inc(chunk.len() as u64);

            self.say(
                &progress,
                format!(
                    "Batch {} complete. Average score: {:.2}/10",
                    batch_index, batch.average_score
                ),
            );
            batches.push(batch);
        }

        progress.finish_and_clear();

        let summary = summarize_batches(&batches);
        log.append(&generate_summary_section(&summary))?;
        info!(
            "Run complete: {} scored, {} failed, average {:.2}",
            summary.total_count, summary.failed_count, summary.average_score
        );

        Ok(RunOutcome {
            log_path: log.path().to_path_buf(),
            batches,
            summary,
        })
    }

    /// Analyze and judge one chunk.
    pub async fn process_batch(
        &self,
        batch_index: usize,
        problems: &[Problem],
    ) -> Result<BatchReport, ItemError> {
        if self.config.isolate_failures {
            return Ok(self.process_batch_isolated(batch_index, problems).await);
        }

        let answers = self.invoker.analyze_batch(problems).await?;
        let scores = self.judge.judge_batch(&answers).await?;

        let results = answers
            .into_iter()
            .zip(scores)
            .map(|(result, score)| ScoredResult { result, score })
            .collect();

        Ok(BatchReport::new(batch_index, results, Vec::new()))
    }

    async fn process_batch_isolated(&self, batch_index: usize, problems: &[Problem]) -> BatchReport {
        let mut failures = Vec::new();
        let mut answers = Vec::new();

        for outcome in self.invoker.analyze_batch_isolated(problems).await {
            match outcome {
                ItemOutcome::Done(answer) => answers.push(answer),
                ItemOutcome::Failed { problem_id, error } => {
                    warn!("Analysis failed for problem {}: {}", problem_id, error);
                    failures.push(FailedProblem { problem_id, error });
                }
            }
        }

        let outcomes = self.judge.judge_batch_isolated(&answers).await;
        let mut results = Vec::with_capacity(answers.len());

        for (result, outcome) in answers.into_iter().zip(outcomes) {
            match outcome {
                ItemOutcome::Done(score) => results.push(ScoredResult { result, score }),
                ItemOutcome::Failed { problem_id, error } => {
                    warn!("Judging failed for problem {}: {}", problem_id, error);
                    failures.push(FailedProblem { problem_id, error });
                }
            }
        }

        failures.sort_by_key(|f| f.problem_id);
        BatchReport::new(batch_index, results, failures)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} problems")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    fn say(&self, progress: &ProgressBar, message: String) {
        if self.config.show_progress {
            progress.suspend(|| println!("{}", message));
        }
    }
}
