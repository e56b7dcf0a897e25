//! Sliding-window rate limiter keyed by client IP.
//!
//! Every admitted connection leaves a timestamp in its client's window. A check
//! prunes the timestamps that fell out of the trailing window and admits the
//! connection only while fewer than `max_requests` remain.

use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Connection is admitted and was recorded in the window.
    Allowed {
        /// Maximum number of connections admitted per window
        limit: usize,
        /// Number of connections still admissible in the current window
        remaining: usize,
    },
    /// Connection is rejected; nothing was recorded.
    Limited {
        /// Maximum number of connections admitted per window
        limit: usize,
        /// Time until the oldest timestamp leaves the window
        reset_after: Duration,
    },
}

impl RateLimitResult {
    /// Returns true if the connection is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the connection is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    /// Get the limit value.
    pub fn limit(&self) -> usize {
        match self {
            RateLimitResult::Allowed { limit, .. } => *limit,
            RateLimitResult::Limited { limit, .. } => *limit,
        }
    }

    /// Get the remaining count (0 when limited).
    pub fn remaining(&self) -> usize {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    /// Get the reset duration if limited.
    pub fn reset_after(&self) -> Option<Duration> {
        match self {
            RateLimitResult::Limited { reset_after, .. } => Some(*reset_after),
            _ => None,
        }
    }
}

/// A per-client sliding-window rate limiter.
///
/// All clients share one lock: prune, check and record happen in a single
/// critical section, so two concurrent checks for the same client can never both
/// take the last free slot.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use tinyhttpd_lib::security::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(10, Duration::from_secs(1));
/// if !limiter.allow("192.168.1.1") {
///     // close the connection
/// }
/// ```
pub struct RateLimiter {
    windows: Mutex<AHashMap<String, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter admitting `max_requests` per client inside `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(AHashMap::new()),
            max_requests: max_requests as usize,
            window,
        }
    }

    /// Admission check returning only the decision.
    pub fn allow(&self, client_ip: &str) -> bool {
        self.check(client_ip).is_allowed()
    }

    /// Check and, when allowed, record a connection attempt at the current instant.
    pub fn check(&self, client_ip: &str) -> RateLimitResult {
        self.check_at(client_ip, Instant::now())
    }

    /// Check and record a connection attempt observed at `now`.
    ///
    /// A timestamp exactly `window` old still counts against the client.
    /// An empty `client_ip` is an ordinary key.
    pub fn check_at(&self, client_ip: &str, now: Instant) -> RateLimitResult {
        let mut windows = self.lock();
        let timestamps = windows.entry(client_ip.to_string()).or_default();
        prune(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            let reset_after = timestamps
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return RateLimitResult::Limited { limit: self.max_requests, reset_after };
        }

        timestamps.push_back(now);
        RateLimitResult::Allowed {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(timestamps.len()),
        }
    }

    /// Drop clients whose window is entirely expired at `now`.
    ///
    /// Returns the number of evicted clients. Admission decisions are unaffected.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before.saturating_sub(windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    // The map holds plain timestamps, so a panic elsewhere cannot leave it inconsistent.
    fn lock(&self) -> MutexGuard<'_, AHashMap<String, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) <= window {
            break;
        }
        timestamps.pop_front();
    }
}
