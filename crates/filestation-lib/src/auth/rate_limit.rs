// ============================
// filestation-lib/src/auth/rate_limit.rs
// ============================
//! Sliding-window rate limiting for login attempts.
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use crate::auth::clock::Clock;

/// Default number of failed attempts before an address is blocked
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Default trailing window for counting failed attempts (15 minutes)
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-address sliding-window counter of failed login attempts.
///
/// The key is whatever address string the HTTP layer hands us; the limiter
/// does not parse or validate it. Entries are pruned lazily on every check,
/// so memory is bounded by the periodic sweep plus the request volume
/// actually received.
pub struct LoginRateLimiter {
    attempts: DashMap<String, Vec<Instant>>,
    max_attempts: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            window,
            clock,
        }
    }

    /// Whether an address has exhausted its attempts within the window.
    /// Prunes attempts older than the window before counting.
    pub fn is_blocked(&self, addr: &str) -> bool {
        let Some(mut entry) = self.attempts.get_mut(addr) else {
            return false;
        };
        let now = self.clock.now();
        entry.retain(|at| now.duration_since(*at) < self.window);
        entry.len() >= self.max_attempts
    }

    /// Record a failed login attempt for an address.
    pub fn record_failure(&self, addr: &str) {
        let now = self.clock.now();
        let mut entry = self.attempts.entry(addr.to_string()).or_default();
        entry.push(now);
        if entry.len() == self.max_attempts {
            warn!(addr, "login attempts exhausted, address blocked");
        }
    }

    /// Drop all history for an address (called on successful login).
    pub fn clear(&self, addr: &str) {
        self.attempts.remove(addr);
    }

    /// Prune every address and remove entries that become empty.
    /// Returns the number of addresses removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.attempts.len();
        self.attempts.retain(|_, attempts| {
            attempts.retain(|at| now.duration_since(*at) < self.window);
            !attempts.is_empty()
        });
        before - self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn limiter(clock: Arc<ManualClock>) -> LoginRateLimiter {
        LoginRateLimiter::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW, clock)
    }

    #[test]
    fn blocks_after_threshold_within_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone());

        for _ in 0..4 {
            limiter.record_failure("10.0.0.1");
        }
        assert!(!limiter.is_blocked("10.0.0.1"));

        limiter.record_failure("10.0.0.1");
        assert!(limiter.is_blocked("10.0.0.1"));

        // other addresses are unaffected
        assert!(!limiter.is_blocked("10.0.0.2"));
    }

    #[test]
    fn old_attempts_fall_out_of_the_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone());

        for _ in 0..5 {
            limiter.record_failure("10.0.0.1");
        }
        assert!(limiter.is_blocked("10.0.0.1"));

        clock.advance(DEFAULT_WINDOW + Duration::from_secs(1));
        assert!(!limiter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn clear_resets_the_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone());

        for _ in 0..5 {
            limiter.record_failure("10.0.0.1");
        }
        limiter.clear("10.0.0.1");
        assert!(!limiter.is_blocked("10.0.0.1"));

        // a fresh failure starts a new window, not a continuation
        limiter.record_failure("10.0.0.1");
        assert!(!limiter.is_blocked("10.0.0.1"));
    }

    #[test]
    fn sweep_removes_empty_addresses() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter(clock.clone());

        limiter.record_failure("10.0.0.1");
        clock.advance(Duration::from_secs(10 * 60));
        limiter.record_failure("10.0.0.2");

        clock.advance(Duration::from_secs(6 * 60));
        // 10.0.0.1 is now outside the window, 10.0.0.2 still inside
        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.attempts.contains_key("10.0.0.2"));
        assert!(!limiter.attempts.contains_key("10.0.0.1"));
    }
}
