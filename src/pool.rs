use futures::stream::{self, StreamExt};
use std::future::Future;

/// Number of workers to use when `--jobs` is not given.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Run `task` over every item with at most `jobs` in flight, collecting every
/// result. Resolves only once all tasks have reported, so each stage ends on
/// a full join barrier before its commit runs.
pub async fn run_all<T, R, F, Fut>(jobs: usize, items: Vec<T>, task: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items.into_iter().map(task))
        .buffer_unordered(jobs.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_items_report_once() {
        let items: Vec<usize> = (0..20).collect();
        let mut results = run_all(3, items, |n| async move {
            tokio::task::yield_now().await;
            n * 2
        })
        .await;
        results.sort();
        let expected: Vec<usize> = (0..20).map(|n| n * 2).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_zero_jobs_still_runs() {
        let results = run_all(0, vec![1, 2, 3], |n| async move { n }).await;
        assert_eq!(results.len(), 3);
    }
}
