use std::time::{Duration, Instant};

/// Counts events and reports their rate once per window.
///
/// Used for the frames/ticks per second debug line.
#[derive(Debug, Clone)]
pub struct RateCounter {
    window: Duration,
    started: Instant,
    count: u64,
}

impl RateCounter {
    pub fn new(window: Duration, now: Instant) -> Self {
        debug_assert!(!window.is_zero());
        Self {
            window,
            started: now,
            count: 0,
        }
    }

    pub fn per_second(now: Instant) -> Self {
        Self::new(Duration::from_secs(1), now)
    }

    pub fn record(&mut self, n: u64) {
        self.count += n;
    }

    /// Returns events per second once the window has elapsed, then starts a
    /// new window.
    pub fn sample(&mut self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.window {
            return None;
        }
        let rate = self.count as f64 / elapsed.as_secs_f64();
        self.started = now;
        self.count = 0;
        Some(rate)
    }
}
