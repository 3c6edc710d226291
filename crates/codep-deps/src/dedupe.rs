//! Collapses concurrent lookups sharing a key into one in-flight future

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tracing::debug;

/// Request de-duplicator.
///
/// While a future for a key is pending, later callers with the same key
/// await that future instead of starting their own. Once it completes the
/// entry is removed, so the next call starts a fresh lookup.
pub struct RequestDeduplicator<T: Clone + Send + Sync + 'static> {
    pending: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone + Send + Sync + 'static> RequestDeduplicator<T> {
    /// Create an empty de-duplicator
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys with a lookup in flight
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run `make()` for `key` unless a run for `key` is already pending, in
    /// which case its result is shared.
    pub async fn dedupe<F, Fut>(&self, key: &str, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(existing) => {
                    debug!("Joining in-flight lookup for {}", key);
                    existing.clone()
                }
                None => {
                    let shared = make().boxed().shared();
                    pending.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        let mut pending = self.pending.lock();
        if pending
            .get(key)
            .is_some_and(|current| current.ptr_eq(&shared))
        {
            pending.remove(key);
        }
        result
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestDeduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for RequestDeduplicator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_run_once() {
        let dedupe = RequestDeduplicator::<Result<String, String>>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..5).map(|_| {
            let calls = calls.clone();
            dedupe.dedupe("npm:react", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("18.2.0".to_string())
            })
        });
        let results = futures::future::join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_deref() == Ok("18.2.0")));
        assert_eq!(dedupe.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_shared() {
        let dedupe = RequestDeduplicator::<Result<String, String>>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..3).map(|_| {
            let calls = calls.clone();
            dedupe.dedupe("npm:reactt", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err("E404".to_string())
            })
        });
        let results = futures::future::join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Err("E404".to_string())));
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let dedupe = RequestDeduplicator::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            dedupe
                .dedupe("go:golang.org/x/net", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst) as u32
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
