use crate::core::{AdapterError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Refcount-guarded shared resource.
///
/// The harness hands one adapter instance to every worker, but the
/// underlying session is expensive and must be shared: the first `acquire`
/// creates it, later acquires reuse it, and only the release matching the
/// last outstanding acquire tears it down. The mutex is held only across
/// the check-and-create and decrement-and-destroy sections, never while a
/// statement executes.
pub struct SharedResource<R> {
    state: Mutex<ResourceState<R>>,
}

struct ResourceState<R> {
    holders: i64,
    resource: Option<Arc<R>>,
}

impl<R> SharedResource<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ResourceState {
                holders: 0,
                resource: None,
            }),
        }
    }

    /// Register one holder, creating the resource through `connect` if no
    /// live instance exists yet.
    ///
    /// Concurrent callers race for the lock, so exactly one of them runs
    /// the factory; the rest receive clones of the same handle. A factory
    /// failure leaves the holder count untouched, so a failed `acquire`
    /// needs no matching `release`.
    pub async fn acquire<F, Fut>(&self, connect: F) -> Result<Arc<R>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let mut state = self.state.lock().await;
        let resource = match &state.resource {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(connect().await?);
                state.resource = Some(Arc::clone(&created));
                created
            }
        };
        state.holders += 1;
        Ok(resource)
    }

    /// Drop one holder. The release matching the last outstanding acquire
    /// runs `teardown` on the resource and forgets the shared handle, so a
    /// later `acquire` starts from scratch.
    ///
    /// A release with no matching acquire drives the holder count negative
    /// and fails with `AdapterError::Invariant`; correct callers can never
    /// observe this.
    pub async fn release<F>(&self, teardown: F) -> Result<()>
    where
        F: FnOnce(&R),
    {
        let mut state = self.state.lock().await;
        state.holders -= 1;
        if state.holders < 0 {
            return Err(AdapterError::Invariant(state.holders));
        }
        if state.holders == 0 {
            if let Some(resource) = state.resource.take() {
                teardown(&resource);
            }
        }
        Ok(())
    }

    /// Current number of live holders.
    pub async fn holders(&self) -> i64 {
        self.state.lock().await.holders
    }
}

impl<R> Default for SharedResource<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_reuses_live_resource() {
        let shared: SharedResource<u32> = SharedResource::new();
        let first = shared.acquire(|| async { Ok(1) }).await.unwrap();
        let second = shared.acquire(|| async { Ok(2) }).await.unwrap();
        assert_eq!(*first, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(shared.holders().await, 2);
    }

    #[tokio::test]
    async fn test_last_release_tears_down() {
        let shared: SharedResource<u32> = SharedResource::new();
        let _handle = shared.acquire(|| async { Ok(1) }).await.unwrap();
        let _other = shared.acquire(|| async { Ok(1) }).await.unwrap();

        let mut teardowns = 0;
        shared.release(|_| teardowns += 1).await.unwrap();
        assert_eq!(teardowns, 0);
        shared.release(|_| teardowns += 1).await.unwrap();
        assert_eq!(teardowns, 1);
    }

    #[tokio::test]
    async fn test_reacquire_after_teardown_reconnects() {
        let shared: SharedResource<u32> = SharedResource::new();
        let handle = shared.acquire(|| async { Ok(1) }).await.unwrap();
        drop(handle);
        shared.release(|_| {}).await.unwrap();

        let reconnected = shared.acquire(|| async { Ok(2) }).await.unwrap();
        assert_eq!(*reconnected, 2);
    }

    #[tokio::test]
    async fn test_unmatched_release_trips_invariant() {
        let shared: SharedResource<u32> = SharedResource::new();
        let err = shared.release(|_| {}).await.unwrap_err();
        assert!(matches!(err, AdapterError::Invariant(-1)));
    }

    #[tokio::test]
    async fn test_failed_acquire_leaves_no_holder() {
        let shared: SharedResource<u32> = SharedResource::new();
        let result = shared
            .acquire(|| async { Err(AdapterError::Configuration("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(shared.holders().await, 0);

        let recovered = shared.acquire(|| async { Ok(5) }).await.unwrap();
        assert_eq!(*recovered, 5);
    }
}
