use glam::{Mat4, Vec3};

/// Simulation bounding rectangle, centered at the origin.
///
/// Width is a design constant; height follows the surface aspect ratio so that
/// one world unit covers the same number of pixels on both axes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct World {
    width: f32,
    height: f32,
}

impl World {
    #[inline]
    pub fn new(width: f32, height: f32) -> Self {
        debug_assert!(width > 0.0 && height > 0.0, "world dimensions must be positive");
        Self { width, height }
    }

    /// Builds a world of the given width matching a `surface_width x surface_height`
    /// pixel surface.
    pub fn for_surface(width: f32, surface_width: u32, surface_height: u32) -> Self {
        let mut world = Self::new(width, width);
        world.fit_surface(surface_width, surface_height);
        world
    }

    /// Recomputes the height in place for a resized surface.
    ///
    /// Returns `false` (and leaves the world untouched) for a zero-area surface,
    /// which winit reports while a window is minimized.
    pub fn fit_surface(&mut self, surface_width: u32, surface_height: u32) -> bool {
        if surface_width == 0 || surface_height == 0 {
            return false;
        }
        self.height = self.width * surface_height as f32 / surface_width as f32;
        debug_assert!(self.height > 0.0);
        true
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    #[inline]
    pub fn half_height(&self) -> f32 {
        self.height * 0.5
    }

    /// Open-rectangle containment: points on the boundary are outside.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (hw, hh) = (self.half_width(), self.half_height());
        x > -hw && x < hw && y > -hh && y < hh
    }

    /// World → clip transform used by the scene renderer.
    ///
    /// Orthographic over the world rectangle, looking down -Z from `(0, 0, 20)`.
    pub fn view_projection(&self) -> Mat4 {
        let (hw, hh) = (self.half_width(), self.half_height());
        let projection = Mat4::orthographic_rh(-hw, hw, -hh, hh, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    // ── sizing ────────────────────────────────────────────────────────────

    #[test]
    fn height_follows_aspect_ratio() {
        let w = World::for_surface(20.0, 800, 600);
        assert_eq!(w.width(), 20.0);
        assert_eq!(w.height(), 15.0);
    }

    #[test]
    fn fit_surface_recomputes_in_place() {
        let mut w = World::for_surface(20.0, 800, 600);
        assert!(w.fit_surface(1000, 1000));
        assert_eq!(w.width(), 20.0);
        assert_eq!(w.height(), 20.0);
    }

    #[test]
    fn fit_surface_ignores_zero_area() {
        let mut w = World::for_surface(20.0, 800, 600);
        assert!(!w.fit_surface(0, 600));
        assert!(!w.fit_surface(800, 0));
        assert_eq!(w.height(), 15.0);
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_origin() {
        assert!(World::new(20.0, 15.0).contains(0.0, 0.0));
    }

    #[test]
    fn contains_excludes_boundary() {
        let w = World::new(20.0, 15.0);
        assert!(!w.contains(10.0, 0.0));
        assert!(!w.contains(-10.0, 0.0));
        assert!(!w.contains(0.0, 7.5));
        assert!(!w.contains(0.0, -7.5));
    }

    #[test]
    fn contains_rejects_just_outside() {
        assert!(!World::new(20.0, 15.0).contains(10.1, 0.0));
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn view_projection_maps_corners_to_clip_edges() {
        let w = World::new(20.0, 15.0);
        let m = w.view_projection();

        let top_right = m * Vec4::new(10.0, 7.5, 0.0, 1.0);
        assert!((top_right.x - 1.0).abs() < 1e-5);
        assert!((top_right.y - 1.0).abs() < 1e-5);

        let bottom_left = m * Vec4::new(-10.0, -7.5, 0.0, 1.0);
        assert!((bottom_left.x + 1.0).abs() < 1e-5);
        assert!((bottom_left.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn view_projection_depth_is_inside_clip_range() {
        let clip = World::new(20.0, 15.0).view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
