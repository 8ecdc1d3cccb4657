use std::time::Instant;

use crate::time::Cadence;

/// Gates simulation ticks to at most `max_ups` per second.
///
/// Polled once per main-loop iteration. Never runs more than one tick per
/// poll; ticks missed during a stall are dropped, not replayed.
#[derive(Debug, Clone)]
pub struct FixedRateScheduler {
    cadence: Cadence,
    ticks: u64,
    paused: bool,
}

impl FixedRateScheduler {
    pub fn new(max_ups: f64, now: Instant) -> Self {
        Self {
            cadence: Cadence::from_hz(max_ups, now),
            ticks: 0,
            paused: false,
        }
    }

    /// Returns the index of the tick to run now, if one is due.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        if self.paused || !self.cadence.poll(now) {
            return None;
        }
        let tick = self.ticks;
        self.ticks += 1;
        Some(tick)
    }

    /// Total ticks issued so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks dropped because the loop stalled for longer than one interval.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.cadence.dropped()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes ticking. Resuming restarts the interval at `now`.
    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if self.paused && !paused {
            self.cadence.reset(now);
        }
        self.paused = paused;
    }
}
