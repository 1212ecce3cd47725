use std::time::Duration;
use tokio::time::Instant;

/// Absolute cutoff for a call, fixed when the call starts.
///
/// Backed by tokio's monotonic clock, so it follows `tokio::time::pause`
/// in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let at = now.checked_add(timeout).unwrap_or_else(|| far_future(now));
        Self { at }
    }

    /// Deadline at a fixed instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// The instant the deadline fires.
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has been reached.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Whether waiting `delay` from now would reach the deadline.
    pub fn would_exceed(&self, delay: Duration) -> bool {
        delay >= self.remaining()
    }
}

// About thirty years, the same horizon tokio uses for "never".
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_tracks_paused_clock() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert_eq!(deadline.remaining(), Duration::from_secs(10));
        assert!(!deadline.is_expired());
        assert!(!deadline.would_exceed(Duration::from_secs(9)));
        assert!(deadline.would_exceed(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(deadline.remaining(), Duration::from_secs(3));
        assert!(deadline.would_exceed(Duration::from_secs(4)));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let deadline = Deadline::after(Duration::MAX);
        assert!(!deadline.is_expired());
    }
}
