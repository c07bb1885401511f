use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per flight. Reservations on the same flight queue behind each
/// other; reservations on different flights never touch the same mutex.
#[derive(Default)]
pub struct FlightLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a reserve step. Dropping it releases the flight.
pub struct FlightGuard {
    _guard: OwnedMutexGuard<()>,
}

impl FlightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, flight_id: i64) -> FlightGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop entries nobody is holding or waiting on.
            locks.retain(|id, l| *id == flight_id || Arc::strong_count(l) > 1);
            locks
                .entry(flight_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        FlightGuard {
            _guard: lock.lock_owned().await,
        }
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_flight_is_exclusive() {
        let locks = Arc::new(FlightLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_flights_do_not_block() {
        let locks = FlightLocks::new();
        let _one = locks.acquire(1).await;
        tokio::time::timeout(Duration::from_millis(200), locks.acquire(2))
            .await
            .expect("flight 2 must not wait on flight 1");
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = FlightLocks::new();
        for id in 0..10 {
            let _g = locks.acquire(id).await;
        }
        let _g = locks.acquire(99).await;
        assert_eq!(locks.tracked(), 1);
    }
}
