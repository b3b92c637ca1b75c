//! All-settle fan-out.
//!
//! Runs one future per item with an optional concurrency cap and waits for
//! every one of them, whatever each returns.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

async fn indexed<Fut: Future>(index: usize, fut: Fut) -> (usize, Fut::Output) {
    (index, fut.await)
}

/// Run `run` over every item and collect all outputs, in input order.
///
/// At most `max_concurrent` futures are in flight; `None` (or zero) means all
/// of them at once. Nothing short-circuits: an `Err` output is just another
/// output.
///
/// # Example
///
/// ```ignore
/// let outcomes = settle_all(feeds, |feed| refresh_one(feed), Some(8)).await;
/// assert_eq!(outcomes.len(), feed_count);
/// ```
pub async fn settle_all<I, T, F, Fut>(items: Vec<I>, run: F, max_concurrent: Option<usize>) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let limit = max_concurrent.filter(|n| *n > 0).unwrap_or(total);
    debug!("Settling {} tasks with max {} concurrent", total, limit);

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut in_flight = FuturesUnordered::new();
    let mut pending = items.into_iter().enumerate();

    // Seed initial batch up to the limit
    for (index, item) in pending.by_ref().take(limit) {
        in_flight.push(indexed(index, run(item)));
    }

    // Refill as tasks settle to keep the limit saturated
    while let Some((index, output)) = in_flight.next().await {
        slots[index] = Some(output);

        if let Some((next, item)) = pending.next() {
            in_flight.push(indexed(next, run(item)));
        }
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_all_empty() {
        let result: Vec<usize> = settle_all(Vec::<usize>::new(), |n| async move { n }, None).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_settle_all_preserves_input_order() {
        let result = settle_all(
            vec![30u64, 10, 20],
            |delay| async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                delay
            },
            None,
        )
        .await;

        assert_eq!(result, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_settle_all_does_not_short_circuit() {
        let attempted = Arc::new(AtomicUsize::new(0));
        let counter = attempted.clone();

        let result: Vec<Result<usize, String>> = settle_all(
            vec![1, 2, 3],
            move |n| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if n == 2 {
                        Err("boom".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            None,
        )
        .await;

        assert_eq!(attempted.load(Ordering::SeqCst), 3);
        assert_eq!(result.len(), 3);
        assert!(result[0].is_ok());
        assert!(result[1].is_err());
        assert!(result[2].is_ok());
    }

    #[tokio::test]
    async fn test_settle_all_respects_concurrency() {
        let concurrent_count = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let cc = concurrent_count.clone();
        let mo = max_observed.clone();

        let result = settle_all(
            vec![1, 2, 3, 4, 5],
            move |n| {
                let cc = cc.clone();
                let mo = mo.clone();
                async move {
                    let current = cc.fetch_add(1, Ordering::SeqCst) + 1;
                    mo.fetch_max(current, Ordering::SeqCst);

                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

                    cc.fetch_sub(1, Ordering::SeqCst);
                    n
                }
            },
            Some(2),
        )
        .await;

        assert_eq!(result, vec![1, 2, 3, 4, 5]);
        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_settle_all_unbounded_runs_everything_at_once() {
        let concurrent_count = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let cc = concurrent_count.clone();
        let mo = max_observed.clone();

        settle_all(
            vec![(); 4],
            move |_| {
                let cc = cc.clone();
                let mo = mo.clone();
                async move {
                    let current = cc.fetch_add(1, Ordering::SeqCst) + 1;
                    mo.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    cc.fetch_sub(1, Ordering::SeqCst);
                }
            },
            None,
        )
        .await;

        assert_eq!(max_observed.load(Ordering::SeqCst), 4);
    }
}
