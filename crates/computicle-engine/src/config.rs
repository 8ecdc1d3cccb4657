//! Simulation constants.
//!
//! There is no config file: the defaults below are the design values and a
//! caller that wants different ones builds the struct directly. `validate`
//! runs once at startup, before any device work.

use std::fmt;

use crate::render::MAX_RING_SIZE;
use crate::sim::kernel::max_particles;
use crate::sim::{Integration, VectorField};

/// Upper bound for `max_ups` and `rotate_hz`.
pub const MAX_RATE_HZ: f64 = 1_000.0;

/// A constant violates a precondition of the component that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoParticles,
    /// More particles than one kernel dispatch covers under default limits.
    TooManyParticles { count: u32, max: u32 },
    RingSize { size: u32, max: usize },
    NonPositive { name: &'static str, value: f64 },
    RateTooHigh { name: &'static str, value: f64, max: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoParticles => write!(f, "particle_count must be at least 1"),
            ConfigError::TooManyParticles { count, max } => {
                write!(f, "particle_count {count} exceeds the dispatch limit of {max}")
            }
            ConfigError::RingSize { size, max } => {
                write!(f, "ring_size {size} is outside 1..={max}")
            }
            ConfigError::NonPositive { name, value } => {
                write!(f, "{name} must be positive and finite, got {value}")
            }
            ConfigError::RateTooHigh { name, value, max } => {
                write!(f, "{name} {value} Hz is above {max} Hz")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of particles, fixed for the life of the store.
    pub particle_count: u32,
    /// Number of trail targets in the ring.
    pub ring_size: u32,
    pub max_age: f32,
    /// Advection step and age increment per tick.
    pub step: f32,
    /// Upper bound on simulation ticks per second.
    pub max_ups: f64,
    /// Ring rotations per second.
    pub rotate_hz: f64,
    /// World width in world units; height follows the surface aspect.
    pub world_width: f32,
    pub field: VectorField,
    /// Particle color before age fading.
    pub tint: [f32; 4],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: 100_000,
            ring_size: 20,
            max_age: 5.0,
            step: 0.01,
            max_ups: 50.0,
            rotate_hz: 10.0,
            world_width: 20.0,
            field: VectorField::default(),
            tint: crate::render::DEFAULT_TINT,
        }
    }
}

impl SimConfig {
    /// Checks every constant. Particle count is checked against
    /// `wgpu::Limits::default()`, the limits the device is requested with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        let max = max_particles(&wgpu::Limits::default());
        if self.particle_count > max {
            return Err(ConfigError::TooManyParticles {
                count: self.particle_count,
                max,
            });
        }
        if self.ring_size == 0 || self.ring_size as usize > MAX_RING_SIZE {
            return Err(ConfigError::RingSize {
                size: self.ring_size,
                max: MAX_RING_SIZE,
            });
        }

        let positive = [
            ("max_age", self.max_age as f64),
            ("step", self.step as f64),
            ("max_ups", self.max_ups),
            ("rotate_hz", self.rotate_hz),
            ("world_width", self.world_width as f64),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        for (name, value) in [("max_ups", self.max_ups), ("rotate_hz", self.rotate_hz)] {
            if value > MAX_RATE_HZ {
                return Err(ConfigError::RateTooHigh {
                    name,
                    value,
                    max: MAX_RATE_HZ,
                });
            }
        }
        Ok(())
    }

    pub fn integration(&self) -> Integration {
        Integration {
            max_age: self.max_age,
            step: self.step,
        }
    }
}
