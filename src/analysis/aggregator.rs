//! Score aggregation and statistics.
//!
//! This module turns the per-problem scores of a run into the averages
//! and score-range histogram written to the final summary.

use crate::models::{BatchReport, RunSummary, ScoreBucket};
use std::collections::BTreeMap;

/// Mean of the given scores, `0.0` when there are none.
pub fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Count scores per bucket. Every bucket is present, possibly with zero.
pub fn score_distribution(scores: &[f64]) -> BTreeMap<ScoreBucket, usize> {
    let mut dist: BTreeMap<ScoreBucket, usize> =
        ScoreBucket::ALL.iter().map(|bucket| (*bucket, 0)).collect();

    for score in scores {
        *dist.entry(ScoreBucket::for_score(*score)).or_default() += 1;
    }

    dist
}

/// Build the run summary from every score of the run.
pub fn summarize(scores: &[f64], failed_count: usize) -> RunSummary {
    RunSummary {
        total_count: scores.len(),
        average_score: average(scores),
        distribution: score_distribution(scores),
        failed_count,
    }
}

/// Build the run summary from the batch reports, in batch order.
pub fn summarize_batches(batches: &[BatchReport]) -> RunSummary {
    let scores: Vec<f64> = batches.iter().flat_map(|b| b.scores()).collect();
    let failed = batches.iter().map(|b| b.failures.len()).sum();
    summarize(&scores, failed)
}

/// Highest and lowest scoring problem ids, for the console summary.
pub fn best_and_worst(batches: &[BatchReport]) -> Option<((usize, f64), (usize, f64))> {
    let mut all = batches
        .iter()
        .flat_map(|b| b.results.iter())
        .map(|r| (r.result.problem_id, r.score));

    let first = all.next()?;
    let (best, worst) = all.fold((first, first), |(best, worst), item| {
        (
            if item.1 > best.1 { item } else { best },
            if item.1 < worst.1 { item } else { worst },
        )
    });

    Some((best, worst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentResult, FailedProblem, ScoredResult};

    fn batch(index: usize, scores: &[(usize, f64)]) -> BatchReport {
        let results = scores
            .iter()
            .map(|(id, score)| ScoredResult {
                result: AgentResult {
                    problem_id: *id,
                    claimed_finding: String::new(),
                    expected_finding: String::new(),
                },
                score: *score,
            })
            .collect();
        BatchReport::new(index, results, vec![])
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[8.0]), 8.0);
        assert_eq!(average(&[2.0, 4.0, 9.0]), 5.0);
    }

    #[test]
    fn test_distribution_counts_sum_to_total() {
        let scores = [0.0, 1.5, 2.0, 3.0, 4.5, 6.0, 7.5, 8.0, 10.0, 10.0];
        let dist = score_distribution(&scores);

        assert_eq!(dist.values().sum::<usize>(), scores.len());
        assert_eq!(dist[&ScoreBucket::ZeroToTwo], 2);
        assert_eq!(dist[&ScoreBucket::TwoToFour], 2);
        assert_eq!(dist[&ScoreBucket::FourToSix], 1);
        assert_eq!(dist[&ScoreBucket::SixToEight], 2);
        assert_eq!(dist[&ScoreBucket::EightToTen], 3);
    }

    #[test]
    fn test_distribution_has_every_bucket() {
        let dist = score_distribution(&[]);
        assert_eq!(dist.len(), 5);
        assert!(dist.values().all(|c| *c == 0));
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[10.0, 0.0, 5.0, 5.0], 1);

        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.average_score, 5.0);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.percentage(ScoreBucket::FourToSix), 50.0);
        assert_eq!(summary.percentage(ScoreBucket::EightToTen), 25.0);
    }

    #[test]
    fn test_summarize_batches() {
        let mut second = batch(2, &[(11, 2.0)]);
        second.failures.push(FailedProblem {
            problem_id: 12,
            error: "timeout".to_string(),
        });
        let batches = vec![batch(1, &[(1, 8.0), (2, 6.0)]), second];

        let summary = summarize_batches(&batches);
        assert_eq!(summary.total_count, 3);
        assert!((summary.average_score - 16.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.failed_count, 1);
    }

    #[test]
    fn test_best_and_worst() {
        let batches = vec![batch(1, &[(1, 3.0), (2, 9.0)]), batch(2, &[(3, 1.0)])];
        let (best, worst) = best_and_worst(&batches).unwrap();
        assert_eq!(best, (2, 9.0));
        assert_eq!(worst, (3, 1.0));

        assert!(best_and_worst(&[]).is_none());
    }
}
