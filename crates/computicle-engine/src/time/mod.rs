//! Time subsystem.
//!
//! Everything here takes `now` as an argument instead of reading the clock,
//! so schedules can be driven by synthetic time in tests. The runtime reads
//! `Instant::now()` once per frame and passes it down.

mod cadence;
mod stats;

pub use cadence::Cadence;
pub use stats::RateCounter;
