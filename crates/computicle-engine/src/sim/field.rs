use std::borrow::Cow;
use std::fmt;

/// A 2D velocity field `(fx(x, y), fy(x, y))`.
///
/// The field is expressed twice: as a pair of WGSL expressions over `x` and `y`
/// (spliced into the device kernel) and as a CPU evaluator used by the
/// reference kernel. Both must describe the same function.
#[derive(Clone)]
pub struct VectorField {
    pub name: Cow<'static, str>,
    pub fx: Cow<'static, str>,
    pub fy: Cow<'static, str>,
    pub eval: fn(f32, f32) -> (f32, f32),
}

impl VectorField {
    /// `fx = cos(x·cos(y))`, `fy = sin(x − y)`.
    pub const SWIRL: VectorField = VectorField {
        name: Cow::Borrowed("swirl"),
        fx: Cow::Borrowed("cos(x * cos(y))"),
        fy: Cow::Borrowed("sin(x - y)"),
        eval: swirl,
    };

    /// Solid-body rotation around the origin.
    pub const VORTEX: VectorField = VectorField {
        name: Cow::Borrowed("vortex"),
        fx: Cow::Borrowed("-y"),
        fy: Cow::Borrowed("x"),
        eval: vortex,
    };

    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> (f32, f32) {
        (self.eval)(x, y)
    }
}

impl Default for VectorField {
    fn default() -> Self {
        Self::SWIRL
    }
}

impl fmt::Debug for VectorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorField")
            .field("name", &self.name)
            .field("fx", &self.fx)
            .field("fy", &self.fy)
            .finish()
    }
}

fn swirl(x: f32, y: f32) -> (f32, f32) {
    ((x * y.cos()).cos(), (x - y).sin())
}

fn vortex(x: f32, y: f32) -> (f32, f32) {
    (-y, x)
}
