//! Singleflight implementation for sharing one in-flight request between callers.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Result of trying to acquire a singleflight slot.
pub enum SingleflightSlot<V> {
    /// We won the race and should execute the operation.
    /// Contains the sender to broadcast the outcome.
    Leader(broadcast::Sender<V>),
    /// Another task is executing; wait for its outcome.
    Follower(broadcast::Receiver<V>),
}

/// Table of in-flight operations keyed by `K`, each producing a `V`.
///
/// When multiple callers ask for the same key concurrently, only the first
/// executes the operation and every other caller receives a clone of its
/// outcome.
///
/// Check-and-register is a single atomic step on the map entry, so two
/// callers can never both become leader for the same key.
pub struct Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    in_flight: DashMap<K, broadcast::Sender<V>>,
}

impl<K, V> Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Atomically try to acquire a slot for this operation.
    ///
    /// Returns `Leader` if this caller should execute the operation,
    /// or `Follower` if another caller is already executing it.
    pub fn acquire(&self, key: K) -> SingleflightSlot<V> {
        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => SingleflightSlot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                SingleflightSlot::Leader(tx)
            }
        }
    }

    /// Remove a settled in-flight operation.
    pub fn complete(&self, key: &K) {
        self.in_flight.remove(key);
    }

    /// Number of operations currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of followers waiting on the operation for `key`.
    pub fn waiters(&self, key: &K) -> usize {
        self.in_flight
            .get(key)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that removes the in-flight entry on drop.
///
/// Covers the leader panicking or its future being dropped mid-request;
/// followers then see a closed channel and retry.
pub struct SingleflightGuard<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    singleflight: &'a Singleflight<K, V>,
    key: K,
    completed: bool,
}

impl<'a, K, V> SingleflightGuard<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(singleflight: &'a Singleflight<K, V>, key: K) -> Self {
        Self {
            singleflight,
            key,
            completed: false,
        }
    }

    /// Mark as completed (normal path).
    pub fn complete(mut self) {
        self.singleflight.complete(&self.key);
        self.completed = true;
    }
}

impl<K, V> Drop for SingleflightGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.singleflight.complete(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_caller_leads_and_second_follows() {
        let sf: Singleflight<&str, u32> = Singleflight::new();

        assert!(matches!(sf.acquire("k"), SingleflightSlot::Leader(_)));
        assert!(matches!(sf.acquire("k"), SingleflightSlot::Follower(_)));
        assert!(matches!(sf.acquire("other"), SingleflightSlot::Leader(_)));
        assert_eq!(sf.in_flight_count(), 2);
    }

    #[tokio::test]
    async fn test_follower_receives_leader_outcome() {
        // Arrange
        let sf: Singleflight<&str, u32> = Singleflight::new();
        let SingleflightSlot::Leader(tx) = sf.acquire("k") else {
            panic!("expected leader");
        };
        let SingleflightSlot::Follower(mut rx) = sf.acquire("k") else {
            panic!("expected follower");
        };
        assert_eq!(sf.waiters(&"k"), 1);

        // Act
        sf.complete(&"k");
        tx.send(42).unwrap();

        // Assert
        assert_eq!(rx.recv().await.unwrap(), 42);
        assert_eq!(sf.in_flight_count(), 0);
    }

    #[test]
    fn test_guard_cleans_up_on_drop() {
        let sf: Singleflight<&str, u32> = Singleflight::new();
        let _slot = sf.acquire("k");

        {
            let _guard = SingleflightGuard::new(&sf, "k");
        }

        assert_eq!(sf.in_flight_count(), 0);
        assert!(matches!(sf.acquire("k"), SingleflightSlot::Leader(_)));
    }

    #[tokio::test]
    async fn test_follower_sees_closed_channel_when_leader_dropped() {
        let sf: Singleflight<&str, u32> = Singleflight::new();
        let leader = sf.acquire("k");
        let SingleflightSlot::Follower(mut rx) = sf.acquire("k") else {
            panic!("expected follower");
        };

        {
            let _guard = SingleflightGuard::new(&sf, "k");
        }
        drop(leader);

        assert!(rx.recv().await.is_err());
    }
}
