//! Clock abstraction: monotonic time for timeouts, wall-clock time for
//! timestamps that travel over the wire (subject to skew tolerance).

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Tolerated wall-clock skew between peers, in both directions.
pub const SKEW_TOLERANCE: Duration = Duration::from_secs(30);

/// Environment-level clock collaborator (§6 "Environment-level interfaces").
///
/// A trait rather than calling `SystemTime::now()`/`Instant::now()` directly
/// so tests can substitute a fixed or controllable clock when exercising
/// timestamp-boundary behaviour (skew edges, TTL expiry).
pub trait Clock: Send + Sync {
    fn now_monotonic(&self) -> Instant;
    fn now_unix_secs(&self) -> i64;
}

/// The real system clock; used by every production node.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_monotonic(&self) -> Instant {
        Instant::now()
    }

    fn now_unix_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Returns whether `timestamp` (unix seconds) is within [`SKEW_TOLERANCE`] of
/// `now`, rejecting values that are too far in the future as well as values
/// that are merely old (callers apply their own max-age/TTL check for that).
pub fn within_skew_tolerance(timestamp: i64, now: i64) -> bool {
    timestamp <= now + SKEW_TOLERANCE.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_future_timestamp_beyond_skew() {
        let now = 1_000_000;
        assert!(within_skew_tolerance(now + 30, now));
        assert!(!within_skew_tolerance(now + 31, now));
    }

    #[test]
    fn accepts_past_timestamp() {
        let now = 1_000_000;
        assert!(within_skew_tolerance(now - 1_000_000, now));
    }
}
