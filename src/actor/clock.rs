//! Tick clock: deadline arithmetic for fixed-rate loops.
//!
//! The clock never sleeps by itself. Callers measure `now`, ask for the
//! remaining slack and decide how to wait, so the same clock serves
//! caller-thread and worker-thread actors alike.

use std::time::{Duration, Instant};

/// Converts a fixed target interval into per-tick deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    interval: Duration,
}

impl TickClock {
    /// Create a clock ticking every `interval`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn new(interval: Duration) -> Self {
        assert!(!interval.is_zero(), "Tick interval must be non-zero");
        Self { interval }
    }

    /// Create a clock ticking `hz` times per second.
    ///
    /// # Panics
    ///
    /// Panics if `hz` is zero.
    pub fn from_frequency(hz: u32) -> Self {
        assert!(hz > 0, "Tick frequency must be non-zero");
        Self::new(Duration::from_secs(1) / hz)
    }

    /// The target tick interval.
    #[inline]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// The target frequency in ticks per second.
    #[inline]
    pub fn frequency(&self) -> f64 {
        1.0 / self.interval.as_secs_f64()
    }

    /// Deadline of a tick starting at `now`.
    #[inline]
    pub fn next_deadline(&self, now: Instant) -> Instant {
        now + self.interval
    }

    /// Deadline of the tick following the one due at `previous`.
    ///
    /// Stays on the `previous + interval` grid while that is still ahead of
    /// `now`. After an overrun the grid restarts from `now` instead of
    /// bursting to catch up.
    #[inline]
    pub fn advance(&self, previous: Instant, now: Instant) -> Instant {
        let next = previous + self.interval;
        if next > now {
            next
        } else {
            self.next_deadline(now)
        }
    }

    /// Time left until `deadline`, clamped to zero.
    #[inline]
    pub fn remaining(&self, deadline: Instant, now: Instant) -> Duration {
        deadline.saturating_duration_since(now)
    }

    /// Whether `now` is past `deadline`.
    #[inline]
    pub fn is_overrun(&self, deadline: Instant, now: Instant) -> bool {
        now > deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_deadline() {
        let clock = TickClock::new(Duration::from_millis(16));
        let now = Instant::now();
        assert_eq!(clock.next_deadline(now) - now, Duration::from_millis(16));
    }

    #[test]
    fn test_from_frequency() {
        let clock = TickClock::from_frequency(60);
        assert_eq!(clock.interval(), Duration::from_secs(1) / 60);
        assert!((clock.frequency() - 60.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn test_zero_interval() {
        TickClock::new(Duration::ZERO);
    }

    #[test]
    fn test_remaining_never_negative() {
        let clock = TickClock::new(Duration::from_millis(10));
        let base = Instant::now();
        for offset_ms in 0..40u64 {
            let now = base + Duration::from_millis(offset_ms);
            let deadline = base + Duration::from_millis(20);
            let remaining = clock.remaining(deadline, now);
            assert!(remaining <= Duration::from_millis(20));
            if offset_ms >= 20 {
                assert_eq!(remaining, Duration::ZERO);
            } else {
                assert_eq!(remaining, Duration::from_millis(20 - offset_ms));
            }
        }
    }

    #[test]
    fn test_overrun_iff_clamped() {
        let clock = TickClock::new(Duration::from_millis(10));
        let deadline = Instant::now() + Duration::from_millis(5);

        let early = deadline - Duration::from_millis(1);
        assert!(!clock.is_overrun(deadline, early));
        assert!(clock.remaining(deadline, early) > Duration::ZERO);

        // Exactly on the deadline: zero slack but not late.
        assert!(!clock.is_overrun(deadline, deadline));
        assert_eq!(clock.remaining(deadline, deadline), Duration::ZERO);

        let late = deadline + Duration::from_millis(1);
        assert!(clock.is_overrun(deadline, late));
        assert_eq!(clock.remaining(deadline, late), Duration::ZERO);
    }

    #[test]
    fn test_advance_stays_on_grid() {
        let clock = TickClock::new(Duration::from_millis(10));
        let start = Instant::now();
        let first = clock.next_deadline(start);

        // Woke slightly after the deadline bookkeeping: keep the grid.
        let now = first + Duration::from_micros(200);
        assert_eq!(clock.advance(first, now), first + Duration::from_millis(10));
    }

    #[test]
    fn test_advance_restarts_after_overrun() {
        let clock = TickClock::new(Duration::from_millis(10));
        let start = Instant::now();
        let first = clock.next_deadline(start);

        // A whole interval late: no catch-up burst.
        let now = first + Duration::from_millis(25);
        assert_eq!(clock.advance(first, now), now + Duration::from_millis(10));
    }
}
