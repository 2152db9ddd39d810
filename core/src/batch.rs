use std::future::Future;

use futures::future::join_all;
use tracing::debug;

/// What a batch run did.
#[derive(Debug)]
pub struct BatchOutcome<'a, T, R> {
    /// Number of sequential groups executed.
    pub groups: usize,
    /// Every item paired with its unit result, in input order.
    pub results: Vec<(&'a T, R)>,
}

/// Run `unit` over `items` in consecutive groups of `limit`.
///
/// Units inside a group run concurrently on the current task; the next group
/// starts only once every unit of the previous one has settled. A `limit` of
/// zero is treated as one.
pub async fn run_batches<'a, T, R, F, Fut>(
    items: &[&'a T],
    limit: usize,
    mut unit: F,
) -> BatchOutcome<'a, T, R>
where
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let limit = limit.max(1);
    let mut groups = 0;
    let mut results = Vec::with_capacity(items.len());

    for group in items.chunks(limit) {
        groups += 1;
        debug!(group = groups, size = group.len(), "starting group");
        let settled = join_all(group.iter().map(|item| unit(*item))).await;
        results.extend(group.iter().copied().zip(settled));
    }

    BatchOutcome { groups, results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_groups_are_bounded_and_counted() {
        let items: Vec<usize> = (0..7).collect();
        let refs: Vec<&usize> = items.iter().collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let outcome = run_batches(&refs, 3, |n: &usize| {
            let in_flight = &in_flight;
            let peak = &peak;
            let n = *n;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n % 2 == 0
            }
        })
        .await;

        assert_eq!(outcome.groups, 3);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.results.len(), 7);
        let failed: Vec<usize> = outcome
            .results
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(n, _)| **n)
            .collect();
        assert_eq!(failed, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_next_group_waits_for_previous() {
        let items: Vec<u64> = vec![30, 1, 1, 1];
        let refs: Vec<&u64> = items.iter().collect();
        let finished = Mutex::new(Vec::new());

        run_batches(&refs, 2, |delay: &u64| {
            let finished = &finished;
            let delay = *delay;
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.lock().unwrap().push(delay);
            }
        })
        .await;

        // The slow unit of group one settles before group two begins.
        assert_eq!(*finished.lock().unwrap(), vec![1, 30, 1, 1]);
    }

    #[tokio::test]
    async fn test_empty_and_zero_limit() {
        let empty: Vec<&u8> = Vec::new();
        let outcome = run_batches(&empty, 3, |_: &u8| async { true }).await;
        assert_eq!(outcome.groups, 0);

        let items = [1u8, 2];
        let refs: Vec<&u8> = items.iter().collect();
        let outcome = run_batches(&refs, 0, |_: &u8| async { true }).await;
        assert_eq!(outcome.groups, 2);
    }
}
