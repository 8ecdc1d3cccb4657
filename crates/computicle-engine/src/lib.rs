//! Computicle engine crate.
//!
//! Particle advection on the GPU with motion trails from a rotating ring of
//! render targets. The platform runtime (`window`, `core`, `device`, `input`)
//! hosts an `App`; `sim` and `render` are the pieces an app wires together.

pub mod config;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod sim;
pub mod time;
pub mod window;
