//! Counter store: the seam between the controller and counter state.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::counter::WindowCounter;
use super::policy::Policy;

/// The admit/reject decision for a single inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed.
    pub admitted: bool,
    /// Requests left in the current window, floored at zero.
    pub remaining: u32,
    /// Time until the window rolls over; zero when admitted.
    pub retry_after: Duration,
}

impl Admission {
    /// An admitted request with the given remaining quota.
    pub fn granted(remaining: u32) -> Self {
        Self {
            admitted: true,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    /// A rejected request that may retry once the window rolls over.
    pub fn denied(retry_after: Duration) -> Self {
        Self {
            admitted: false,
            remaining: 0,
            retry_after,
        }
    }

    /// `Retry-After` hint in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Uniquely identifies a live counter: a client key under a policy scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterId {
    /// The client key the policy is keyed on.
    pub key: String,
    /// The policy scope the counter belongs to.
    pub scope: String,
}

impl CounterId {
    /// Create a new counter id.
    pub fn new(key: &str, scope: &str) -> Self {
        Self {
            key: key.to_string(),
            scope: scope.to_string(),
        }
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.key)
    }
}

/// Capability interface over counter state.
///
/// This trait abstracts the in-process [`MemoryCounterStore`] so that a
/// shared external counter store (for multi-process deployments) is a
/// drop-in substitution.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Charge one request against `key` under `policy` and decide admission.
    ///
    /// The read-check-increment is a single atomic operation per
    /// (key, scope) pair.
    async fn check_and_increment(&self, key: &str, policy: &Policy, now: Instant) -> Admission;

    /// Refund one previously charged request.
    ///
    /// Floors at zero and is a no-op when no counter exists for the pair.
    async fn decrement(&self, key: &str, scope: &str);

    /// Delete the counter so the next request starts a fresh window.
    async fn reset(&self, key: &str, scope: &str);

    /// Remove every counter whose window has elapsed.
    ///
    /// Returns the number of counters removed.
    async fn sweep(&self, now: Instant) -> usize;
}

/// In-process counter store over a sharded concurrent map.
///
/// Entry-level locking keeps `check_and_increment` atomic per (key, scope)
/// pair while the sweep walks shards without blocking checks on unrelated
/// keys. No operation performs I/O or suspends.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    /// Live counters indexed by (key, scope)
    counters: DashMap<CounterId, WindowCounter>,
}

impl MemoryCounterStore {
    /// Create an empty counter store.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Current count for a key under a scope.
    ///
    /// Returns `None` if no live counter exists for the pair.
    pub fn current_count(&self, key: &str, scope: &str) -> Option<u32> {
        self.counters
            .get(&CounterId::new(key, scope))
            .map(|counter| counter.count)
    }

    /// Number of live counters.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Drop all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.counters.clear();
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn check_and_increment(&self, key: &str, policy: &Policy, now: Instant) -> Admission {
        match self.counters.entry(CounterId::new(key, &policy.scope)) {
            Entry::Vacant(slot) => {
                trace!(key, scope = %policy.scope, "Opening rate limit window");
                let counter = slot.insert(WindowCounter::start(now, policy.window));
                Admission::granted(counter.remaining(policy.max_requests))
            }
            Entry::Occupied(mut slot) => {
                let counter = slot.get_mut();
                if counter.is_expired(now) {
                    *counter = WindowCounter::start(now, policy.window);
                    return Admission::granted(counter.remaining(policy.max_requests));
                }
                if counter.count < policy.max_requests {
                    counter.count += 1;
                    return Admission::granted(counter.remaining(policy.max_requests));
                }
                let denied = Admission::denied(counter.retry_after(now));
                debug!(
                    key,
                    scope = %policy.scope,
                    limit = policy.max_requests,
                    "Rate limit exceeded"
                );
                denied
            }
        }
    }

    async fn decrement(&self, key: &str, scope: &str) {
        if let Some(mut counter) = self.counters.get_mut(&CounterId::new(key, scope)) {
            counter.count = counter.count.saturating_sub(1);
        }
    }

    async fn reset(&self, key: &str, scope: &str) {
        self.counters.remove(&CounterId::new(key, scope));
    }

    async fn sweep(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now));
        before.saturating_sub(self.counters.len())
    }
}
