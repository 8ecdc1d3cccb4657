use bytemuck::{Pod, Zeroable};
use rand::Rng;

use super::world::World;

/// A single particle as laid out in the device buffer (12 bytes).
///
///  offset 0  x    f32
///  offset 4  y    f32
///  offset 8  age  f32
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub age: f32,
}

impl Particle {
    pub const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    #[inline]
    pub const fn new(x: f32, y: f32, age: f32) -> Self {
        Self { x, y, age }
    }

    /// Vertex layout for drawing the particle buffer directly as a point list.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Particle>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Samples a fresh particle: position uniform over the open world
    /// rectangle, age uniform in `[0, max_age)`.
    pub fn spawn<R: Rng + ?Sized>(world: &World, max_age: f32, rng: &mut R) -> Self {
        debug_assert!(max_age > 0.0);
        Self {
            x: open_interval(rng, world.half_width()),
            y: open_interval(rng, world.half_height()),
            age: rng.gen_range(0.0..max_age),
        }
    }
}

/// Uniform sample from `(-half, half)`.
///
/// `gen_range` is half-open, so the lower bound is rejected explicitly.
fn open_interval<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    loop {
        let v = rng.gen_range(-half..half);
        if v > -half {
            return v;
        }
    }
}

/// Initial population of `count` particles.
pub fn populate<R: Rng + ?Sized>(world: &World, count: usize, max_age: f32, rng: &mut R) -> Vec<Particle> {
    (0..count).map(|_| Particle::spawn(world, max_age, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn layout_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<Particle>(), 12);
        assert_eq!(Particle::layout().array_stride, 12);
    }

    #[test]
    fn spawn_lands_inside_world_with_valid_age() {
        let world = World::new(20.0, 15.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let p = Particle::spawn(&world, 5.0, &mut rng);
            assert!(world.contains(p.x, p.y), "spawned outside: {p:?}");
            assert!((0.0..5.0).contains(&p.age), "bad age: {p:?}");
        }
    }

    #[test]
    fn populate_produces_requested_count() {
        let world = World::new(20.0, 15.0);
        let mut rng = StdRng::seed_from_u64(1);
        let ps = populate(&world, 257, 5.0, &mut rng);
        assert_eq!(ps.len(), 257);
    }

    #[test]
    fn populate_is_deterministic_for_a_seed() {
        let world = World::new(20.0, 15.0);
        let a = populate(&world, 32, 5.0, &mut StdRng::seed_from_u64(42));
        let b = populate(&world, 32, 5.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
