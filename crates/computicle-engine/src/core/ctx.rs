use std::time::Instant;

use winit::window::Window;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::InputFrame;
use crate::render::{RenderCtx, SurfaceTarget};

use super::app::AppControl;

/// Context passed to `App::on_init`.
pub struct InitCtx<'a, 'w> {
    pub gpu: &'a Gpu<'w>,
    pub now: Instant,
}

impl<'a, 'w> InitCtx<'a, 'w> {
    pub fn render_ctx(&self) -> RenderCtx<'_> {
        RenderCtx::of(self.gpu)
    }
}

/// Per-frame context passed to `App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    /// Key edges since the previous frame.
    pub input_frame: &'a InputFrame,
    /// Taken once per iteration; every phase of the frame uses this value.
    pub now: Instant,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Drawable size in physical pixels; zero while minimized.
    pub fn surface_size(&self) -> (u32, u32) {
        let size = self.gpu.size();
        (size.width, size.height)
    }

    /// Acquires the next surface texture, lets `draw` record every pass of the
    /// frame into one encoder, then submits once and presents.
    ///
    /// `draw` does not run while the surface has zero area or could not be
    /// acquired. A fatal surface error returns `Exit`.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut SurfaceTarget<'_>),
    {
        let (w, h) = self.surface_size();
        if w == 0 || h == 0 {
            return AppControl::Continue;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        {
            let rctx = RenderCtx::of(self.gpu);
            let mut target = SurfaceTarget {
                encoder: &mut frame.encoder,
                surface_view: &frame.view,
            };
            draw(&rctx, &mut target);
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
