use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::BookingError;

/// Per-trip in-process serialization point.
///
/// Every seat transition of a trip runs while holding that trip's guard.
/// Entries are created on first use and evicted once the last guard or
/// waiter for the trip is gone.
#[derive(Clone)]
pub struct TripLocks {
    inner: Arc<Inner>,
    timeout: Duration,
}

#[derive(Default)]
struct Inner {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl TripLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::default(),
            timeout,
        }
    }

    /// Wait for the trip's lock, giving up with `ConcurrencyConflict` after
    /// the configured timeout.
    pub async fn lock(&self, trip_id: Uuid) -> Result<TripGuard, BookingError> {
        let entry = self
            .inner
            .locks
            .entry(trip_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, entry.lock_owned()).await {
            Ok(guard) => Ok(TripGuard {
                trip_id,
                inner: Arc::clone(&self.inner),
                guard: Some(guard),
            }),
            Err(_) => {
                tracing::warn!(trip_id = %trip_id, "Timed out waiting for trip lock");
                self.inner.evict_if_idle(trip_id);
                Err(BookingError::ConcurrencyConflict)
            }
        }
    }

    /// Number of trips with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.locks.is_empty()
    }
}

impl Inner {
    fn evict_if_idle(&self, trip_id: Uuid) {
        self.locks
            .remove_if(&trip_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct TripGuard {
    trip_id: Uuid,
    inner: Arc<Inner>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TripGuard {
    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }
}

impl Drop for TripGuard {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a user.
        drop(self.guard.take());
        self.inner.evict_if_idle(self.trip_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_evicted_after_release() {
        let locks = TripLocks::new(Duration::from_millis(100));
        let trip = Uuid::new_v4();

        let guard = locks.lock(trip).await.unwrap();
        assert_eq!(guard.trip_id(), trip);
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_times_out_while_held() {
        let locks = TripLocks::new(Duration::from_millis(20));
        let trip = Uuid::new_v4();

        let _guard = locks.lock(trip).await.unwrap();
        let err = locks.lock(trip).await.err();
        assert_eq!(err, Some(BookingError::ConcurrencyConflict));

        // Other trips are unaffected
        assert!(locks.lock(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let locks = TripLocks::new(Duration::from_secs(1));
        let trip = Uuid::new_v4();

        let guard = locks.lock(trip).await.unwrap();
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(trip).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(guard);

        assert!(waiter.await.unwrap().is_ok());
        assert!(locks.is_empty());
    }
}
