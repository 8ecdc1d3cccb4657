use std::time::Instant;

use crate::time::Cadence;

/// Fixed-size ring of render-target slots with a timed rotation policy.
///
/// Position 0 is the active slot: the only one drawn into this frame. Each
/// rotation shifts the ring left by one (`[a, b, c] → [b, c, a]`), so the slot
/// that becomes active is the one that has gone longest without being
/// written, and the previously active slot moves to the back.
///
/// A slot is one value, so whatever it bundles (target and sampling handle)
/// always rotates together.
#[derive(Debug)]
pub struct TargetRing<T> {
    slots: Vec<T>,
    cadence: Cadence,
    just_rotated: bool,
    rotations: u64,
}

/// The active slot handed to a draw, with the clear-or-accumulate decision.
#[derive(Debug)]
pub struct ActiveTarget<'a, T> {
    pub slot: &'a T,
    /// Clear before drawing (first draw after a rotation); otherwise accumulate.
    pub clear: bool,
}

impl<T> TargetRing<T> {
    /// Builds a ring rotating `rotate_hz` times per second.
    ///
    /// A fresh ring reports `just_rotated`, so the first draw clears.
    pub fn new(slots: Vec<T>, rotate_hz: f64, now: Instant) -> Self {
        debug_assert!(!slots.is_empty(), "ring needs at least one slot");
        Self {
            slots,
            cadence: Cadence::from_hz(rotate_hz, now),
            just_rotated: true,
            rotations: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn active(&self) -> &T {
        &self.slots[0]
    }

    #[inline]
    pub fn just_rotated(&self) -> bool {
        self.just_rotated
    }

    /// Total rotations since construction.
    #[inline]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Slots in ring order, active first.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.slots.iter()
    }

    /// Mutable slots in ring order. Order cannot be changed through this.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.slots.iter_mut()
    }

    /// Rotates by one position unconditionally.
    pub fn rotate(&mut self) {
        self.slots.rotate_left(1);
        self.just_rotated = true;
        self.rotations += 1;
    }

    /// Rotates if the rotation interval has elapsed. Returns whether it did.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.cadence.poll(now) {
            return false;
        }
        self.rotate();
        true
    }

    /// Hands out the active slot for drawing and consumes `just_rotated`.
    pub fn draw_into_active(&mut self) -> ActiveTarget<'_, T> {
        let clear = std::mem::replace(&mut self.just_rotated, false);
        ActiveTarget {
            slot: &self.slots[0],
            clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ring(k: usize) -> TargetRing<usize> {
        TargetRing::new((0..k).collect(), 10.0, Instant::now())
    }

    fn order(r: &TargetRing<usize>) -> Vec<usize> {
        r.iter().copied().collect()
    }

    // ── rotation ──────────────────────────────────────────────────────────

    #[test]
    fn rotate_once_shifts_left() {
        let mut r = ring(3);
        r.draw_into_active();
        r.rotate();
        assert_eq!(order(&r), vec![1, 2, 0]);
        assert!(r.just_rotated());
    }

    #[test]
    fn draw_after_rotation_clears_then_accumulates() {
        let mut r = ring(3);
        r.draw_into_active();
        r.rotate();

        let first = r.draw_into_active();
        assert_eq!(*first.slot, 1);
        assert!(first.clear);
        assert!(!r.just_rotated());

        let second = r.draw_into_active();
        assert_eq!(*second.slot, 1);
        assert!(!second.clear);
    }

    #[test]
    fn fresh_ring_clears_on_first_draw() {
        let mut r = ring(4);
        assert!(r.draw_into_active().clear);
        assert!(!r.draw_into_active().clear);
    }

    #[test]
    fn k_rotations_restore_order() {
        for k in [1, 2, 3, 20] {
            let mut r = ring(k);
            let before = order(&r);
            for _ in 0..k {
                r.rotate();
            }
            assert_eq!(order(&r), before, "k = {k}");
            assert_eq!(r.rotations(), k as u64);
        }
    }

    #[test]
    fn newly_active_slot_is_least_recently_written() {
        let k = 5;
        let mut r = ring(k);
        let mut last_written = vec![0u64; k];
        for frame in 1..=40u64 {
            let active = *r.draw_into_active().slot;
            last_written[active] = frame;
            r.rotate();
            let next = *r.active();
            let oldest = (0..k).min_by_key(|&i| last_written[i]).unwrap();
            assert_eq!(next, oldest, "frame {frame}");
        }
    }

    // ── bundled slots ─────────────────────────────────────────────────────

    #[test]
    fn bundled_handles_rotate_in_lockstep() {
        #[derive(Debug, PartialEq)]
        struct Slot {
            target: u32,
            texture: u32,
        }
        let slots = (0..4).map(|i| Slot { target: i, texture: 100 + i }).collect();
        let mut r = TargetRing::new(slots, 10.0, Instant::now());
        for _ in 0..7 {
            r.rotate();
            for s in r.iter() {
                assert_eq!(s.texture, 100 + s.target);
            }
        }
    }

    // ── timed rotation ────────────────────────────────────────────────────

    #[test]
    fn tick_rotates_at_configured_rate() {
        let t0 = Instant::now();
        let mut r = TargetRing::new(vec![0, 1, 2], 10.0, t0);
        assert!(!r.tick(t0 + Duration::from_millis(99)));
        assert!(r.tick(t0 + Duration::from_millis(100)));
        assert_eq!(*r.active(), 1);
        assert!(!r.tick(t0 + Duration::from_millis(150)));
        assert!(r.tick(t0 + Duration::from_millis(200)));
        assert_eq!(*r.active(), 2);
    }

    #[test]
    fn tick_count_over_a_second_at_60hz() {
        let t0 = Instant::now();
        let mut r = TargetRing::new(vec![0; 20], 10.0, t0);
        let mut n = 0;
        for k in 1..=60u64 {
            if r.tick(t0 + Duration::from_secs_f64(k as f64 / 60.0)) {
                n += 1;
            }
        }
        assert_eq!(n, 10);
    }
}
