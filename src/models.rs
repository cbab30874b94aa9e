//! Data models for the benchmark harness.
//!
//! This module contains the core data structures that flow through the
//! pipeline: problems, agent answers, scores, and the per-batch and
//! per-run aggregates built from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest score the judge can award.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score the judge can award.
pub const MAX_SCORE: f64 = 10.0;

/// A code sample with its known-correct vulnerability description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable identifier, 1-based load position unless the dataset provides one.
    pub id: usize,
    /// Source code handed to the analysis agent.
    pub code_text: String,
    /// Ground-truth description of the vulnerability.
    pub expected_finding: String,
}

impl Problem {
    /// Creates a new problem.
    pub fn new(id: usize, code_text: impl Into<String>, expected_finding: impl Into<String>) -> Self {
        Self {
            id,
            code_text: code_text.into(),
            expected_finding: expected_finding.into(),
        }
    }
}

/// The analysis agent's answer for one problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Identifier of the problem this answer belongs to.
    pub problem_id: usize,
    /// Free-text vulnerability claim produced by the agent.
    pub claimed_finding: String,
    /// Ground truth copied through from the problem.
    pub expected_finding: String,
}

/// An agent answer together with the judge's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub result: AgentResult,
    /// Alignment score in `[0, 10]`.
    pub score: f64,
}

/// Outcome of a single problem when failures are isolated per item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    /// The stage completed for this item.
    Done(T),
    /// The stage failed for this item only.
    Failed { problem_id: usize, error: String },
}

/// A problem that could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedProblem {
    pub problem_id: usize,
    pub error: String,
}

/// Results of one chunk of the pipeline, in problem order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// 1-based chunk number.
    pub batch_index: usize,
    /// Scored results in the same order as the chunk's problems.
    pub results: Vec<ScoredResult>,
    /// Problems that failed (only populated when failures are isolated).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedProblem>,
    /// Mean of this chunk's scores.
    pub average_score: f64,
}

impl BatchReport {
    /// Builds a report and computes its average.
    pub fn new(batch_index: usize, results: Vec<ScoredResult>, failures: Vec<FailedProblem>) -> Self {
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        Self {
            batch_index,
            average_score: crate::analysis::average(&scores),
            results,
            failures,
        }
    }

    /// Scores in problem order.
    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.results.iter().map(|r| r.score)
    }
}

/// Fixed score ranges used for the final distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoreBucket {
    /// `[0, 2)`
    ZeroToTwo,
    /// `[2, 4)`
    TwoToFour,
    /// `[4, 6)`
    FourToSix,
    /// `[6, 8)`
    SixToEight,
    /// `[8, 10]` and anything not caught above
    EightToTen,
}

impl ScoreBucket {
    /// All buckets in display order.
    pub const ALL: [ScoreBucket; 5] = [
        ScoreBucket::ZeroToTwo,
        ScoreBucket::TwoToFour,
        ScoreBucket::FourToSix,
        ScoreBucket::SixToEight,
        ScoreBucket::EightToTen,
    ];

    /// Places a score in its bucket. The last bucket catches everything else.
    pub fn for_score(score: f64) -> Self {
        if (0.0..2.0).contains(&score) {
            ScoreBucket::ZeroToTwo
        } else if (2.0..4.0).contains(&score) {
            ScoreBucket::TwoToFour
        } else if (4.0..6.0).contains(&score) {
            ScoreBucket::FourToSix
        } else if (6.0..8.0).contains(&score) {
            ScoreBucket::SixToEight
        } else {
            ScoreBucket::EightToTen
        }
    }

    /// Label used in the log.
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBucket::ZeroToTwo => "0-2",
            ScoreBucket::TwoToFour => "2-4",
            ScoreBucket::FourToSix => "4-6",
            ScoreBucket::SixToEight => "6-8",
            ScoreBucket::EightToTen => "8-10",
        }
    }
}

impl fmt::Display for ScoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Aggregate over every score of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of scored problems.
    pub total_count: usize,
    /// Mean score, `0.0` for an empty run.
    pub average_score: f64,
    /// Count per score range.
    pub distribution: BTreeMap<ScoreBucket, usize>,
    /// Problems that failed and were excluded from the statistics.
    pub failed_count: usize,
}

impl RunSummary {
    /// Share of scored problems in a bucket, as a percentage.
    pub fn percentage(&self, bucket: ScoreBucket) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let count = self.distribution.get(&bucket).copied().unwrap_or(0);
        (count as f64 / self.total_count as f64) * 100.0
    }
}
