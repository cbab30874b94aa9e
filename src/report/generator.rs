//! Plain-text report generation.
//!
//! Builds the sections of the cumulative pipeline log and the repository
//! scan report. All output is human-readable text.

use crate::models::{BatchReport, FailedProblem, RunSummary, ScoreBucket, ScoredResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

const HEAVY_RULE_WIDTH: usize = 50;
const LIGHT_RULE_WIDTH: usize = 40;
const SCAN_RULE_WIDTH: usize = 46;

/// Title line that opens every batch section.
pub const BATCH_TITLE: &str = "RESULTS";

/// Title of the final summary section.
pub const SUMMARY_TITLE: &str = "FINAL SUMMARY";

fn heavy_rule() -> String {
    "=".repeat(HEAVY_RULE_WIDTH)
}

fn light_rule() -> String {
    "-".repeat(LIGHT_RULE_WIDTH)
}

/// Generate the header written when the log is created.
pub fn generate_log_header(started: DateTime<Local>, total_problems: usize) -> String {
    format!(
        "PIPELINE RESULTS - {}\nTotal problems: {}\n",
        started.format("%Y-%m-%d %H:%M:%S"),
        total_problems
    )
}

/// One problem block of a batch section.
enum BatchEntry<'a> {
    Scored(&'a ScoredResult),
    Failed(&'a FailedProblem),
}

impl BatchEntry<'_> {
    fn problem_id(&self) -> usize {
        match self {
            BatchEntry::Scored(scored) => scored.result.problem_id,
            BatchEntry::Failed(failed) => failed.problem_id,
        }
    }
}

/// Generate the section for one processed batch, in problem order.
pub fn generate_batch_section(batch: &BatchReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("\n\n{}\n", heavy_rule()));
    section.push_str(&format!("BATCH {} {}\n", batch.batch_index, BATCH_TITLE));
    section.push_str(&format!("{}\n\n", heavy_rule()));

    let mut entries: Vec<BatchEntry<'_>> = batch
        .results
        .iter()
        .map(BatchEntry::Scored)
        .chain(batch.failures.iter().map(BatchEntry::Failed))
        .collect();
    entries.sort_by_key(BatchEntry::problem_id);

    for entry in entries {
        section.push_str(&format!("Problem {}:\n", entry.problem_id()));
        match entry {
            BatchEntry::Scored(scored) => {
                section.push_str("Model's Answer:\n");
                section.push_str(&format!("{}\n\n", scored.result.claimed_finding.trim()));
                section.push_str("Expected Answer:\n");
                section.push_str(&format!("{}\n\n", scored.result.expected_finding));
                section.push_str(&format!("Score: {:.1}/10\n", scored.score));
            }
            BatchEntry::Failed(failed) => {
                section.push_str(&format!("FAILED: {}\n", failed.error));
            }
        }
        section.push_str(&format!("{}\n\n", light_rule()));
    }

    section
}

/// Generate the final summary section.
pub fn generate_summary_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!("\n\n{}\n", heavy_rule()));
    section.push_str(&format!("{}\n", SUMMARY_TITLE));
    section.push_str(&format!("{}\n\n", heavy_rule()));

    section.push_str(&format!(
        "Total problems processed: {}\n",
        summary.total_count
    ));
    section.push_str(&format!(
        "Average score: {:.2}/10\n",
        summary.average_score
    ));
    if summary.failed_count > 0 {
        section.push_str(&format!("Failed problems: {}\n", summary.failed_count));
    }

    section.push_str("\nScore distribution:\n");
    for bucket in ScoreBucket::ALL {
        let count = summary.distribution.get(&bucket).copied().unwrap_or(0);
        section.push_str(&format!(
            "{}: {} problems ({:.1}%)\n",
            bucket,
            count,
            summary.percentage(bucket)
        ));
    }

    section
}

/// Repository name from its URL: last path segment without `.git`.
pub fn repo_name_from_url(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    last.trim_end_matches(".git").to_string()
}

/// Generate the vulnerability report for a scanned repository.
pub fn generate_vulnerability_report(
    repo_url: &str,
    scan_date: DateTime<Local>,
    findings: &str,
) -> String {
    let rule = "=".repeat(SCAN_RULE_WIDTH);
    let mut report = String::new();

    report.push('\n');
    report.push_str(&format!("{}\n", rule));
    report.push_str(&format!(
        "SECURITY VULNERABILITY REPORT FOR {}\n",
        repo_name_from_url(repo_url)
    ));
    report.push_str(&format!("{}\n\n", rule));
    report.push_str(&format!("GitHub Repository: {}\n", repo_url));
    report.push_str(&format!(
        "Scan Date: {}\n\n",
        scan_date.format("%a %b %e %H:%M:%S %z %Y")
    ));
    report.push_str("IDENTIFIED VULNERABILITIES:\n");
    report.push_str("---------------------------\n");
    report.push_str(findings);
    report.push('\n');

    report
}

/// First `n` non-blank lines of a report, for the console.
pub fn preview_lines(report: &str, n: usize) -> Vec<&str> {
    report
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .collect()
}

/// Default report path inside `reports_dir`, stamped with `now`.
pub fn default_report_path(reports_dir: &Path, now: DateTime<Local>) -> PathBuf {
    reports_dir.join(format!(
        "vulnerability_report_{}.txt",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Write a report to `output`, or to a timestamped file in `reports_dir`.
pub fn save_report(report: &str, output: Option<&Path>, reports_dir: &Path) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            std::fs::create_dir_all(reports_dir).with_context(|| {
                format!("Failed to create reports directory {}", reports_dir.display())
            })?;
            default_report_path(reports_dir, Local::now())
        }
    };

    std::fs::write(&path, report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(path)
}
