//! GPU device, surface and shader programs.
//!
//! - `Gpu` owns the device/queue and the window's surface
//! - `ShaderProgram` validates WGSL before any pipeline is built from it and
//!   reflects its uniform structs into name-addressed `UniformBlock`s

mod error;
mod frame;
mod gpu;
mod init;
mod program;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use program::{ShaderError, ShaderProgram, UniformBlock};
