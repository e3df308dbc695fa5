//! Pending OAuth `state` nonces.
//!
//! Each login/launch issues a one-time nonce that the callback must present.
//! The store is bounded two ways: entries expire after a TTL, and when the
//! capacity is reached the oldest pending entry is evicted. Both bounds keep
//! abandoned logins from accumulating for the lifetime of the process.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Bounded, expiring set of pending authorization states.
///
/// Interior mutability behind a mutex: the store is shared across request
/// handlers running on parallel runtime threads.
#[derive(Debug)]
pub struct StateStore {
    ttl: Duration,
    capacity: usize,
    // Insertion-ordered, so expiry and eviction both work from the front.
    pending: Mutex<VecDeque<(String, Instant)>>,
}

impl StateStore {
    /// Create a store with the given entry lifetime and capacity bound.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Issue a fresh nonce and record it as pending.
    pub fn issue(&self) -> String {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());

        Self::prune(&mut pending, self.ttl);
        while pending.len() >= self.capacity {
            pending.pop_front();
        }
        pending.push_back((state.clone(), Instant::now()));

        state
    }

    /// Consume a pending nonce. Returns `true` exactly once per issued,
    /// unexpired state; repeated, unknown, or expired states return `false`.
    pub fn consume(&self, state: &str) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());

        Self::prune(&mut pending, self.ttl);
        match pending.iter().position(|(nonce, _)| nonce == state) {
            Some(index) => {
                pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of currently pending, unexpired states.
    pub fn len(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut pending, self.ttl);
        pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(pending: &mut VecDeque<(String, Instant)>, ttl: Duration) {
        let now = Instant::now();
        while let Some((_, issued_at)) = pending.front() {
            if now.duration_since(*issued_at) > ttl {
                pending.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_state_is_consumed_exactly_once() {
        let store = StateStore::new(Duration::from_secs(300), 10);
        let state = store.issue();

        assert!(store.consume(&state));
        assert!(!store.consume(&state));
    }

    #[test]
    fn unknown_state_is_rejected() {
        let store = StateStore::new(Duration::from_secs(300), 10);
        store.issue();

        assert!(!store.consume("never-issued"));
    }

    #[test]
    fn expired_states_are_rejected() {
        let store = StateStore::new(Duration::ZERO, 10);
        let state = store.issue();

        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.consume(&state));
        assert!(store.is_empty());
    }

    #[test]
    fn capacity_overflow_evicts_the_oldest() {
        let store = StateStore::new(Duration::from_secs(300), 2);
        let first = store.issue();
        let second = store.issue();
        let third = store.issue();

        assert!(!store.consume(&first));
        assert!(store.consume(&second));
        assert!(store.consume(&third));
    }

    #[test]
    fn nonces_are_unique() {
        let store = StateStore::new(Duration::from_secs(300), 10);
        assert_ne!(store.issue(), store.issue());
    }
}
