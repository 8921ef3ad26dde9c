use crate::gateway::cache::Fingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type FlightLock = Arc<tokio::sync::Mutex<()>>;

/// Per-fingerprint async locks so identical questions asked at the same time
/// reach the engine once; later callers wait and then read the cache.
#[derive(Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<Fingerprint, FlightLock>>,
}

pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: Fingerprint,
    lock: FlightLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &Fingerprint) -> FlightGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        // Built before waiting so a cancelled waiter still releases its entry
        let mut flight = FlightGuard {
            owner: self,
            key: key.clone(),
            lock,
            guard: None,
        };
        flight.guard = Some(Arc::clone(&flight.lock).lock_owned().await);
        flight
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the lock: nobody holds or waits on it
        let idle = locks
            .get(&self.key)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(&self.lock) == 2);
        if idle {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_entry_removed_after_release() {
        let flights = SingleFlight::new();
        let key = Fingerprint::of("q", "default");
        {
            let _guard = flights.acquire(&key).await;
            assert_eq!(flights.in_flight(), 1);
        }
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let flights = Arc::new(SingleFlight::new());
        let key = Fingerprint::of("q", "default");

        let guard = flights.acquire(&key).await;

        let waiter = {
            let flights = Arc::clone(&flights);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = flights.acquire(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_entry() {
        let flights = Arc::new(SingleFlight::new());
        let key = Fingerprint::of("q", "default");

        let guard = flights.acquire(&key).await;

        let waiter = {
            let flights = Arc::clone(&flights);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = flights.acquire(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(flights.in_flight(), 1);

        drop(guard);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire(&Fingerprint::of("a", "default")).await;
        let _b = flights.acquire(&Fingerprint::of("b", "default")).await;
        assert_eq!(flights.in_flight(), 2);
    }
}
