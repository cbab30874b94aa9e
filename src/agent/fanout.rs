//! Bounded parallel dispatch shared by the invoker and the judge.
//!
//! All requests of a batch are created up front and awaited behind a
//! single join barrier; a semaphore caps how many run at once. Output
//! order always matches input order.

use crate::llm::LlmError;
use crate::models::ItemOutcome;
use futures::future::join_all;
use std::future::Future;
use thiserror::Error;
use tokio::sync::Semaphore;

/// A reasoning request that failed for one problem.
#[derive(Debug, Error)]
#[error("problem {problem_id}: {source}")]
pub struct ItemError {
    pub problem_id: usize,
    #[source]
    pub source: LlmError,
}

/// Run `f` over every item with at most `limit` futures in flight.
pub async fn bounded_join<'a, T, R, F, Fut>(items: &'a [T], limit: usize, f: F) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;

    let tasks = items.iter().map(|item| {
        let task = f(item);
        async move {
            let _permit = semaphore.acquire().await.ok();
            task.await
        }
    });

    join_all(tasks).await
}

/// Fail the whole batch on the first error, in input order.
pub fn collect_all<R>(results: Vec<Result<R, ItemError>>) -> Result<Vec<R>, ItemError> {
    results.into_iter().collect()
}

/// Keep every item, marking failed ones.
pub fn collect_isolated<R>(results: Vec<Result<R, ItemError>>) -> Vec<ItemOutcome<R>> {
    results
        .into_iter()
        .map(|result| match result {
            Ok(value) => ItemOutcome::Done(value),
            Err(e) => ItemOutcome::Failed {
                problem_id: e.problem_id,
                error: e.source.to_string(),
            },
        })
        .collect()
}
