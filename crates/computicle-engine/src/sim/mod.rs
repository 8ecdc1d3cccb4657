//! Particle simulation.
//!
//! A fixed population lives in a device buffer and is advanced by a compute
//! kernel at a bounded tick rate. `kernel::advance` is the same rule on the
//! CPU; tests check the device kernel against it.

mod field;
pub mod kernel;
mod particle;
mod scheduler;
mod store;
mod world;

pub use field::VectorField;
pub use kernel::{Integration, SimulationKernel};
pub use particle::{populate, Particle};
pub use scheduler::FixedRateScheduler;
pub use store::ParticleStore;
pub use world::World;
