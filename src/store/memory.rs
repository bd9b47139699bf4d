//! In-process shared store
//!
//! Keeps every map, counter and sequence behind a single mutex. A condvar is
//! notified whenever a counter changes so `await_zero` callers wake as soon as
//! the last worker reports instead of sleeping out the full poll interval.
//!
//! # Example
//!
//! ```
//! use benchlatch::store::{InMemoryStore, SharedStore};
//! use std::time::Duration;
//!
//! let store = InMemoryStore::new();
//! assert!(store.try_init_counter("run", 1).unwrap());
//! store.count_down("run").unwrap();
//! assert!(store.await_zero("run", Duration::from_millis(10)).unwrap());
//! ```

use super::{SharedStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct State {
    maps: HashMap<String, HashMap<String, Vec<u8>>>,
    counters: HashMap<String, u64>,
    lists: HashMap<String, Vec<Vec<u8>>>,

    /// Bumped by `interrupt_waiters`; a waiter that sees it move bails out
    interrupt_epoch: u64,
}

/// Shared store living in the current process
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    changed: Condvar,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every thread blocked in `await_zero` with `StoreError::Interrupted`
    pub fn interrupt_waiters(&self) {
        let mut state = self.lock();
        state.interrupt_epoch = state.interrupt_epoch.wrapping_add(1);
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave State half-updated
        // (every mutation is a single insert/assign), so poisoning is ignored.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SharedStore for InMemoryStore {
    fn put_if_absent(&self, map: &str, key: &str, value: &[u8]) -> StoreResult<bool> {
        let mut state = self.lock();
        let entries = state.maps.entry(map.to_string()).or_default();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn try_init_counter(&self, name: &str, count: u64) -> StoreResult<bool> {
        let mut state = self.lock();
        if state.counters.contains_key(name) {
            return Ok(false);
        }
        state.counters.insert(name.to_string(), count);
        self.changed.notify_all();
        Ok(true)
    }

    fn count_down(&self, name: &str) -> StoreResult<u64> {
        let mut state = self.lock();
        let counter = state
            .counters
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCounter(name.to_string()))?;
        *counter = counter.saturating_sub(1);
        let remaining = *counter;
        self.changed.notify_all();
        Ok(remaining)
    }

    fn count(&self, name: &str) -> StoreResult<u64> {
        self.lock()
            .counters
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownCounter(name.to_string()))
    }

    fn await_zero(&self, name: &str, timeout: Duration) -> StoreResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let epoch = state.interrupt_epoch;

        loop {
            match state.counters.get(name) {
                None => return Err(StoreError::UnknownCounter(name.to_string())),
                Some(0) => return Ok(true),
                Some(_) => {}
            }
            if state.interrupt_epoch != epoch {
                return Err(StoreError::Interrupted);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }

            // Spurious wakeups just go round the loop again
            let (guard, _) = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    fn append(&self, list: &str, item: Vec<u8>) -> StoreResult<()> {
        self.lock().lists.entry(list.to_string()).or_default().push(item);
        Ok(())
    }

    fn snapshot(&self, list: &str) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self.lock().lists.get(list).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_put_if_absent_first_writer_wins() {
        let store = InMemoryStore::new();
        assert!(store.put_if_absent("flags", "run", b"1").unwrap());
        assert!(!store.put_if_absent("flags", "run", b"2").unwrap());
        // Same key in another map is independent
        assert!(store.put_if_absent("other", "run", b"1").unwrap());
    }

    #[test]
    fn test_put_if_absent_race() {
        let store = Arc::new(InMemoryStore::new());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.put_if_absent("flags", "run", b"1").unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_counter_init_once() {
        let store = InMemoryStore::new();
        assert!(store.try_init_counter("run", 3).unwrap());
        store.count_down("run").unwrap();

        // Late initializer must not reset the remaining count
        assert!(!store.try_init_counter("run", 3).unwrap());
        assert_eq!(store.count("run").unwrap(), 2);
    }

    #[test]
    fn test_count_down_saturates_at_zero() {
        let store = InMemoryStore::new();
        store.try_init_counter("run", 1).unwrap();
        assert_eq!(store.count_down("run").unwrap(), 0);
        assert_eq!(store.count_down("run").unwrap(), 0);
        assert_eq!(store.count("run").unwrap(), 0);
    }

    #[test]
    fn test_unknown_counter() {
        let store = InMemoryStore::new();
        assert!(matches!(store.count("missing"), Err(StoreError::UnknownCounter(_))));
        assert!(matches!(store.count_down("missing"), Err(StoreError::UnknownCounter(_))));
        assert!(matches!(
            store.await_zero("missing", Duration::from_millis(1)),
            Err(StoreError::UnknownCounter(_))
        ));
    }

    #[test]
    fn test_await_zero_times_out() {
        let store = InMemoryStore::new();
        store.try_init_counter("run", 1).unwrap();

        let start = Instant::now();
        assert!(!store.await_zero("run", Duration::from_millis(20)).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_await_zero_wakes_on_count_down() {
        let store = Arc::new(InMemoryStore::new());
        store.try_init_counter("run", 1).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let start = Instant::now();
                let reached = store.await_zero("run", Duration::from_secs(10)).unwrap();
                (reached, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        store.count_down("run").unwrap();

        let (reached, elapsed) = waiter.join().unwrap();
        assert!(reached);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_interrupt_waiters() {
        let store = Arc::new(InMemoryStore::new());
        store.try_init_counter("run", 1).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.await_zero("run", Duration::from_secs(10)))
        };

        // Keep interrupting until the waiter has taken its epoch snapshot and
        // been woken by a later bump
        while !waiter.is_finished() {
            store.interrupt_waiters();
            thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(waiter.join().unwrap(), Err(StoreError::Interrupted)));
        assert_eq!(store.count("run").unwrap(), 1);
    }

    #[test]
    fn test_append_and_snapshot() {
        let store = InMemoryStore::new();
        assert!(store.snapshot("results").unwrap().is_empty());

        store.append("results", vec![1]).unwrap();
        let snapshot = store.snapshot("results").unwrap();
        store.append("results", vec![2]).unwrap();

        // Snapshot is a copy; later appends are not visible through it
        assert_eq!(snapshot, vec![vec![1]]);
        assert_eq!(store.snapshot("results").unwrap(), vec![vec![1], vec![2]]);
    }
}
