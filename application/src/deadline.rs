//! Deadline arithmetic for suspension points
//!
//! Every potentially long call in the pipeline carries a deadline derived
//! from its caller's. A `Deadline` is a cheap copyable wrapper around a
//! monotonic instant.

use std::time::Duration;
use tokio::time::Instant;

/// An absolute point in time a call must finish by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    /// A deadline far enough away to never trigger in practice.
    pub fn unbounded() -> Self {
        // One year; tokio instants saturate, this just needs to outlive any run.
        Self(Instant::now() + Duration::from_secs(365 * 24 * 3600))
    }

    /// The underlying instant.
    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The earlier of the two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Remaining time clamped to `cap`, for per-attempt sub-deadlines.
    pub fn bounded(&self, cap: Duration) -> Duration {
        self.remaining().min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_counts_down() {
        let deadline = Deadline::after(Duration::from_secs(60));
        let remaining = deadline.remaining();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(59));
        assert!(!deadline.is_expired());
    }

    #[test]
    fn test_expired_deadline() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_min_picks_earlier() {
        let near = Deadline::after(Duration::from_secs(1));
        let far = Deadline::after(Duration::from_secs(100));
        assert_eq!(near.min(far), near);
        assert_eq!(far.min(near), near);
    }

    #[test]
    fn test_bounded_clamps() {
        let deadline = Deadline::after(Duration::from_secs(100));
        assert_eq!(deadline.bounded(Duration::from_secs(5)), Duration::from_secs(5));
    }
}
