use parking_lot::Mutex;
use std::{collections::HashSet, hash::Hash};

/// Keys with an outstanding request. At most one request per key at a time.
#[derive(Debug)]
pub(crate) struct InFlight<K> {
    keys: Mutex<HashSet<K>>,
}

impl<K> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
        }
    }
}

/// Releases its key when dropped, including when the request future is dropped.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a, K: Eq + Hash> {
    set: &'a InFlight<K>,
    key: K,
}

impl<K: Copy + Eq + Hash> InFlight<K> {
    /// Claims `key`, or returns `None` if it is already claimed.
    pub(crate) fn acquire(&self, key: K) -> Option<InFlightGuard<'_, K>> {
        self.keys
            .lock()
            .insert(key)
            .then_some(InFlightGuard { set: self, key })
    }

    pub(crate) fn contains(&self, key: K) -> bool {
        self.keys.lock().contains(&key)
    }
}

impl<K: Eq + Hash> Drop for InFlightGuard<'_, K> {
    fn drop(&mut self) {
        self.set.keys.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use crate::in_flight::InFlight;

    #[test]
    fn one_claim_per_key() {
        let in_flight = InFlight::default();

        let guard = in_flight.acquire(1).unwrap();
        assert!(in_flight.acquire(1).is_none());
        assert!(in_flight.acquire(2).is_some());
        assert!(in_flight.contains(1));

        drop(guard);
        assert!(!in_flight.contains(1));
        assert!(in_flight.acquire(1).is_some());
    }
}
