//! Fan-out/join over every configured backend.
//!
//! Coin-agnostic queries issue one sub-query per backend and join all results
//! before a single response is written. `join_all` pins `results[i]` to
//! `backends[i]` whatever the completion order, fires the join exactly once,
//! and handles sub-queries that complete synchronously the same as deferred
//! ones.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

use crate::backend::Backend;

/// Run `query` against every backend concurrently and join the results in
/// backend order (ascending coin name, per the registry).
pub async fn query_all<T, F, Fut>(backends: &[Arc<dyn Backend>], query: F) -> Vec<T>
where
    F: Fn(Arc<dyn Backend>) -> Fut,
    Fut: Future<Output = T>,
{
    let queries: Vec<_> = backends.iter().map(|b| query(Arc::clone(b))).collect();
    join_all(queries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendRegistry;
    use crate::mock::MockBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_follow_registry_order_not_completion_order() {
        // The first coin by name gets the longest delay, so completion order
        // is the reverse of registry order.
        let registry = BackendRegistry::new(vec![
            MockBackend::new("BTC")
                .with_delay(Duration::from_millis(30))
                .into_arc(),
            MockBackend::new("DOGE")
                .with_delay(Duration::from_millis(15))
                .into_arc(),
            MockBackend::new("LTC").into_arc(),
        ]);

        let stats = query_all(registry.all(), |backend| async move {
            let stats = backend.query_pool_stats().await;
            (backend.coin().name.clone(), stats)
        })
        .await;

        let names: Vec<_> = stats.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, ["BTC", "DOGE", "LTC"]);
    }

    #[tokio::test]
    async fn every_backend_is_queried_exactly_once() {
        let registry = BackendRegistry::new(vec![
            MockBackend::new("BTC").into_arc(),
            MockBackend::new("LTC").into_arc(),
        ]);

        let calls = AtomicUsize::new(0);
        let results = query_all(registry.all(), |backend| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { backend.coin().name.clone() }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(results, ["BTC", "LTC"]);
    }

    #[tokio::test]
    async fn empty_registry_joins_to_empty() {
        let registry = BackendRegistry::new(Vec::new());
        let results: Vec<u64> = query_all(registry.all(), |_| async move { 0 }).await;
        assert!(results.is_empty());
    }
}
