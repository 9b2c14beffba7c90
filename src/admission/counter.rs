//! Window counter bookkeeping.

use std::time::{Duration, Instant};

/// A single client's request count within one fixed window.
///
/// One live counter exists per (client key, policy scope) pair. A counter
/// whose `window_end` has passed is logically absent even before the sweep
/// physically removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCounter {
    /// Requests charged in this window so far.
    pub count: u32,
    /// When the current window started.
    pub window_start: Instant,
    /// When the current window rolls over.
    pub window_end: Instant,
}

impl WindowCounter {
    /// Start a fresh window with the first request already counted.
    pub fn start(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_start: now,
            window_end: now + window,
        }
    }

    /// Whether the window has rolled over.
    ///
    /// A request arriving exactly at `window_end` belongs to the next
    /// window. Only `window_end` is consulted, so a `now` earlier than
    /// `window_start` never triggers a reset.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_end
    }

    /// Requests left under the given ceiling, floored at zero.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// Time until the window rolls over, zero once it has.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.window_end.saturating_duration_since(now)
    }
}
