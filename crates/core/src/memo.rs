//! Compute-once caches for lazily fetched remote state
//!
//! [`Memo`] holds a single value, [`MemoMap`] one value per key. Both run the
//! initializer at most once successfully: concurrent first callers wait for
//! the in-flight computation instead of starting their own, and a failed
//! computation leaves the slot empty so the next caller tries again.
//! Nothing is ever evicted.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

/// Single-slot memoized value
#[derive(Debug)]
pub struct Memo<T> {
    cell: OnceCell<T>,
}

impl<T> Memo<T> {
    /// Create an empty memo
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Create a memo that already holds `value`; the initializer never runs
    pub fn ready(value: T) -> Self {
        Self {
            cell: OnceCell::new_with(Some(value)),
        }
    }

    /// Return the stored value without computing it
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether a value has been stored
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the stored value, computing it with `init` if needed
    pub async fn get_or_try_init<E, F, Fut>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Memoized values keyed by argument
///
/// The map lock is only held while looking up the slot for a key, so slow
/// computations for different keys run independently.
#[derive(Debug)]
pub struct MemoMap<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> MemoMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: K) -> Arc<OnceCell<V>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key).or_default().clone()
    }

    /// Drop the slot for `key` if it is still `slot` and holds no value
    fn discard_empty(&self, key: &K, slot: &Arc<OnceCell<V>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized())
        {
            slots.remove(key);
        }
    }

    /// Return the value stored for `key`, computing it with `init` if needed
    ///
    /// A failed computation leaves no entry behind for `key`.
    pub async fn get_or_try_init<E, F, Fut>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key.clone());
        match slot.get_or_try_init(init).await {
            Ok(value) => Ok(value.clone()),
            Err(e) => {
                self.discard_empty(&key, &slot);
                Err(e)
            }
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return the value stored for `key` without computing it
    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Whether a value has been stored for `key`
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for MemoMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_memo_computes_once() {
        let memo = Memo::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = memo
                .get_or_try_init(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memo_does_not_cache_failure() {
        let memo: Memo<u32> = Memo::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let first = memo
            .get_or_try_init(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("transient")
            })
            .await;
        assert_eq!(first.unwrap_err(), "transient");
        assert!(!memo.is_ready());

        let second = memo
            .get_or_try_init(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(7)
            })
            .await
            .unwrap();
        assert_eq!(*second, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_memo_ready_skips_init() {
        let memo = Memo::ready("preset");
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let value = memo
            .get_or_try_init(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>("computed")
            })
            .await
            .unwrap();
        assert_eq!(*value, "preset");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_memo_single_flight() {
        let memo = Memo::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let init = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ()>(1)
        };

        let (a, b) = tokio::join!(memo.get_or_try_init(init), memo.get_or_try_init(init));
        assert_eq!(*a.unwrap(), 1);
        assert_eq!(*b.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memo_map_keys_are_independent() {
        let map: MemoMap<String, usize> = MemoMap::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for key in ["a", "b", "a", "b", "a"] {
            map.get_or_try_init(key.to_string(), move || async move {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst))
            })
            .await
            .unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(map.get(&"a".to_string()), Some(0));
        assert_eq!(map.get(&"b".to_string()), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn test_memo_map_failure_leaves_key_empty() {
        let map: MemoMap<&str, u8> = MemoMap::new();

        let err = map
            .get_or_try_init("missing", || async { Err::<u8, _>("absent") })
            .await
            .unwrap_err();
        assert_eq!(err, "absent");
        assert!(!map.contains_key(&"missing"));
        assert!(map.is_empty());

        let value = map
            .get_or_try_init("missing", || async { Ok::<_, &str>(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
        assert!(map.contains_key(&"missing"));
    }

    #[tokio::test]
    async fn test_memo_map_failures_do_not_grow_map() {
        let map: MemoMap<String, u8> = MemoMap::new();

        for i in 0..5 {
            map.get_or_try_init(format!("ghost-{i}"), || async { Err::<u8, _>("absent") })
                .await
                .unwrap_err();
        }
        assert_eq!(map.slot_count(), 0);

        map.get_or_try_init("photos".to_string(), || async { Ok::<_, &str>(1) })
            .await
            .unwrap();
        assert_eq!(map.slot_count(), 1);
    }

    #[tokio::test]
    async fn test_memo_map_single_flight_per_key() {
        let map: MemoMap<&str, usize> = MemoMap::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let init = move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst))
        };

        let (a, b) = tokio::join!(
            map.get_or_try_init("photos", init),
            map.get_or_try_init("photos", init)
        );
        assert_eq!(a.unwrap(), 0);
        assert_eq!(b.unwrap(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
