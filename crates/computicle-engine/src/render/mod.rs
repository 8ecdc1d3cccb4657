//! Rendering: the trail target ring and the two passes that use it.
//!
//! Per frame the scene renderer draws the particle store into the ring's
//! active slot, then the compositor blends every slot onto the surface.
//! Each renderer owns its GPU resources (pipelines, buffers, bind groups).

mod compositor;
mod ctx;
mod ring;
mod scene;
mod targets;

pub use compositor::{slot_table, slot_weight, Compositor, MAX_RING_SIZE};
pub use ctx::{RenderCtx, SurfaceTarget};
pub use ring::{ActiveTarget, TargetRing};
pub use scene::{SceneRenderer, DEFAULT_TINT, MIN_INTENSITY};
pub use targets::{check_extent, TargetError, TargetSlot, TrailTargets, TRAIL_FORMAT};
