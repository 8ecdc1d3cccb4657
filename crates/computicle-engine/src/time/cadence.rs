use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_nanos(1);

/// Fires at most once per poll, no more often than once per interval.
///
/// The next due time advances by whole intervals so that a caller polling
/// faster than the interval fires exactly once per interval boundary,
/// regardless of its own rate. A caller that falls a full interval behind does
/// not get a burst of catch-up fires: the schedule re-anchors at `now` and the
/// missed boundaries are dropped.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    next_due: Instant,
    dropped: u64,
}

impl Cadence {
    /// First fire is due one interval after `now`.
    ///
    /// The interval is at least one nanosecond.
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next_due: now + interval,
            dropped: 0,
        }
    }

    /// Cadence firing at most `hz` times per second.
    pub fn from_hz(hz: f64, now: Instant) -> Self {
        debug_assert!(hz > 0.0 && hz.is_finite());
        Self::new(Duration::from_secs_f64(1.0 / hz), now)
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of interval boundaries skipped because the caller stalled.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Restarts the schedule so the next fire is one interval after `now`.
    pub fn reset(&mut self, now: Instant) {
        self.next_due = now + self.interval;
    }

    /// Returns `true` if an interval boundary has been reached since the last fire.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }

        self.next_due += self.interval;
        if self.next_due <= now {
            let behind = now.saturating_duration_since(self.next_due);
            let missed = 1 + (behind.as_nanos() / self.interval.as_nanos()) as u64;
            self.dropped += missed;
            log::trace!("cadence {:?}: dropped {missed} interval(s)", self.interval);
            self.next_due = now + self.interval;
        }

        true
    }
}
