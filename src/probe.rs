//! Availability probe.
//!
//! Before mutating a resource the admin decides which verb the backend will
//! accept for that id, without sending a verb that might be rejected noisily.
//! Existence is checked against the resource list (remote, or the local
//! mirror when the backend is down). Decisions are memoized per id for the
//! lifetime of the owning orchestrator: no TTL, no eviction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Verb decision for updates. `Unknown` falls back to PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodDecision {
    Put,
    None,
    Unknown,
}

/// Verb decision for deletes. `Unknown` falls back to DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    Delete,
    None,
    Unknown,
}

/// The three outcomes every probe can produce.
pub trait Decision: Copy + std::fmt::Debug + Send {
    const FOUND: Self;
    const ABSENT: Self;
    const UNKNOWN: Self;
}

impl Decision for MethodDecision {
    const FOUND: Self = MethodDecision::Put;
    const ABSENT: Self = MethodDecision::None;
    const UNKNOWN: Self = MethodDecision::Unknown;
}

impl Decision for DeleteDecision {
    const FOUND: Self = DeleteDecision::Delete;
    const ABSENT: Self = DeleteDecision::None;
    const UNKNOWN: Self = DeleteDecision::Unknown;
}

/// id → decision map.
pub struct ProbeCache<D> {
    entries: Mutex<HashMap<i64, D>>,
}

impl<D: Decision> Default for ProbeCache<D> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: Decision> ProbeCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<D> {
        self.entries.lock().ok()?.get(&id).copied()
    }

    fn insert(&self, id: i64, decision: D) {
        match self.entries.lock() {
            Ok(mut map) => {
                map.insert(id, decision);
            }
            Err(e) => warn!(id, error = %e, "probe cache lock poisoned, decision not memoized"),
        }
    }

    /// Resolve the decision for `id`.
    ///
    /// `list_ids` fetches the ids of the current resource list; it is only
    /// invoked on a cache miss. An unauthorized list fetch propagates and is
    /// not memoized; any other list failure memoizes `UNKNOWN`.
    pub async fn probe<F, Fut>(&self, id: Option<i64>, list_ids: F) -> Result<D, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<i64>, ApiError>>,
    {
        let Some(id) = id else {
            return Ok(D::UNKNOWN);
        };
        if let Some(cached) = self.get(id) {
            debug!(id, decision = ?cached, "probe cache hit");
            return Ok(cached);
        }

        let decision = match list_ids().await {
            Ok(ids) if ids.contains(&id) => D::FOUND,
            Ok(_) => D::ABSENT,
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(id, error = %e, "probe list fetch failed");
                D::UNKNOWN
            }
        };
        self.insert(id, decision);
        debug!(id, decision = ?decision, "probe resolved");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_missing_id_is_unknown_without_fetch() {
        let cache = ProbeCache::<MethodDecision>::new();
        let calls = AtomicUsize::new(0);
        let d = cache
            .probe(None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1])
            })
            .await
            .unwrap();
        assert_eq!(d, MethodDecision::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_found_is_put_and_memoized() {
        let cache = ProbeCache::<MethodDecision>::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let d = cache
                .probe(Some(4), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![3, 4])
                })
                .await
                .unwrap();
            assert_eq!(d, MethodDecision::Put);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_absent_is_none_and_never_reprobed() {
        let cache = ProbeCache::<DeleteDecision>::new();
        let first = cache.probe(Some(9), || async { Ok(vec![1]) }).await.unwrap();
        assert_eq!(first, DeleteDecision::None);
        // Backend later gains id 9; the memoized NONE still wins.
        let second = cache.probe(Some(9), || async { Ok(vec![1, 9]) }).await.unwrap();
        assert_eq!(second, DeleteDecision::None);
    }

    #[tokio::test]
    async fn test_list_failure_memoizes_unknown() {
        let cache = ProbeCache::<MethodDecision>::new();
        let d = cache
            .probe(Some(2), || async { Err(ApiError::Storage("disk".into())) })
            .await
            .unwrap();
        assert_eq!(d, MethodDecision::Unknown);
        assert_eq!(cache.get(2), Some(MethodDecision::Unknown));
    }

    #[tokio::test]
    async fn test_unauthorized_propagates_and_is_not_memoized() {
        let cache = ProbeCache::<MethodDecision>::new();
        let err = cache
            .probe(Some(2), || async { Err(ApiError::Unauthorized) })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(cache.get(2), None);
    }
}
