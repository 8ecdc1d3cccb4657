use rand::Rng;

use crate::device::{ShaderError, ShaderProgram, UniformBlock};

use super::field::VectorField;
use super::particle::Particle;
use super::store::ParticleStore;
use super::world::World;

/// Invocations per compute workgroup.
pub const WORKGROUP_SIZE: u32 = 64;

const ADVECT_TEMPLATE: &str = include_str!("shaders/advect.wgsl");

/// Integration constants shared by the reference and device kernels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Integration {
    /// Particles respawn before their age reaches this value.
    pub max_age: f32,
    /// Advection step and age increment per tick.
    pub step: f32,
}

impl Default for Integration {
    fn default() -> Self {
        Self {
            max_age: 5.0,
            step: 0.01,
        }
    }
}

// ── reference kernel ──────────────────────────────────────────────────────

/// One tick of the advect-or-respawn rule for a single particle.
///
/// The particle advects when it is inside the world and the advected state
/// is still inside with `age + step < max_age`; otherwise it respawns.
pub fn advance<R: Rng + ?Sized>(
    world: &World,
    field: &VectorField,
    integration: Integration,
    p: Particle,
    rng: &mut R,
) -> Particle {
    let Integration { max_age, step } = integration;

    if world.contains(p.x, p.y) {
        let (fx, fy) = field.sample(p.x, p.y);
        let next = Particle::new(p.x + step * fx, p.y + step * fy, p.age + step);
        if next.age < max_age && world.contains(next.x, next.y) {
            return next;
        }
    }

    Particle::spawn(world, max_age, rng)
}

/// One tick over a whole population.
///
/// Each particle reads only its own prior state, so iteration order is
/// irrelevant.
pub fn step_all<R: Rng + ?Sized>(
    world: &World,
    field: &VectorField,
    integration: Integration,
    particles: &mut [Particle],
    rng: &mut R,
) {
    for p in particles.iter_mut() {
        *p = advance(world, field, integration, *p, rng);
    }
}

// ── device kernel ─────────────────────────────────────────────────────────

/// Expands the kernel template for `field`.
pub fn kernel_source(field: &VectorField) -> String {
    ADVECT_TEMPLATE
        .replace("{{FX}}", &field.fx)
        .replace("{{FY}}", &field.fy)
        .replace("{{WORKGROUP_SIZE}}", &WORKGROUP_SIZE.to_string())
}

/// Compiles the advect kernel for `field`.
pub fn compile(field: &VectorField) -> Result<ShaderProgram, ShaderError> {
    ShaderProgram::compile(
        format!("computicle advect kernel ({})", field.name),
        kernel_source(field),
    )
}

/// Number of workgroups covering `count` particles.
#[inline]
pub fn workgroups_for(count: u32) -> u32 {
    count.div_ceil(WORKGROUP_SIZE)
}

/// Largest store one dispatch covers: the kernel runs a 1D grid.
#[inline]
pub fn max_particles(limits: &wgpu::Limits) -> u32 {
    limits
        .max_compute_workgroups_per_dimension
        .saturating_mul(WORKGROUP_SIZE)
}

/// Compute pipeline running the advect kernel over a `ParticleStore`.
pub struct SimulationKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    params_ubo: wgpu::Buffer,
    params: UniformBlock,
    workgroups: u32,
}

impl SimulationKernel {
    /// Compiles the kernel and binds it to `store`.
    ///
    /// `seed` is drawn once at startup; per-tick variation comes from the tick
    /// index, not from reseeding.
    pub fn new(
        device: &wgpu::Device,
        field: &VectorField,
        integration: Integration,
        store: &ParticleStore,
        seed: u32,
    ) -> Result<Self, ShaderError> {
        let program = compile(field)?;
        let mut params = program.uniform_block(0, 0)?;

        params.set("max_age", &integration.max_age);
        params.set("step", &integration.step);
        params.set("seed", &seed);
        params.set("count", &store.len());

        let module = program.create_module(device);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("computicle advect bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: params.min_binding_size(),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(store.byte_size()),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("computicle advect pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("computicle advect pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let params_ubo = params.create_buffer(device);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("computicle advect bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: store.buffer().as_entire_binding(),
                },
            ],
        });

        log::info!(
            "advect kernel ready: field `{}` ({}, {}), {} workgroups of {}",
            field.name,
            field.fx,
            field.fy,
            workgroups_for(store.len()),
            WORKGROUP_SIZE
        );

        Ok(Self {
            pipeline,
            bind_group,
            params_ubo,
            params,
            workgroups: workgroups_for(store.len()),
        })
    }

    /// Records one tick over the whole store into `encoder`.
    ///
    /// Uses the world in effect at recording time.
    pub fn dispatch(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        world: &World,
        tick: u64,
    ) {
        self.params.set("world", &[world.width(), world.height()]);
        self.params.set("tick", &(tick as u32));
        self.params.flush(queue, &self.params_ubo);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("computicle advect pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups, 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    fn world() -> World {
        World::new(20.0, 15.0)
    }

    // ── advect ────────────────────────────────────────────────────────────

    #[test]
    fn interior_particle_advects_along_field() {
        let field = VectorField::default();
        let p = Particle::new(1.0, 2.0, 1.0);
        let next = advance(&world(), &field, Integration::default(), p, &mut rng());

        let (fx, fy) = field.sample(1.0, 2.0);
        assert_eq!(next.x, 1.0 + 0.01 * fx);
        assert_eq!(next.y, 2.0 + 0.01 * fy);
        assert_eq!(next.age, 1.0 + 0.01);
    }

    #[test]
    fn field_is_pluggable() {
        let p = Particle::new(1.0, 2.0, 1.0);
        let next = advance(&world(), &VectorField::VORTEX, Integration::default(), p, &mut rng());
        assert_eq!(next.x, 1.0 + 0.01 * -2.0);
        assert_eq!(next.y, 2.0 + 0.01 * 1.0);
    }

    // ── respawn ───────────────────────────────────────────────────────────

    #[test]
    fn particle_about_to_age_out_respawns() {
        // 4.995 + 0.01 would cross max_age.
        let p = Particle::new(0.0, 0.0, 4.995);
        let next = advance(&world(), &VectorField::default(), Integration::default(), p, &mut rng());

        assert_ne!(next.age, 4.995 + 0.01);
        assert!((0.0..5.0).contains(&next.age));
        assert!(world().contains(next.x, next.y));
    }

    #[test]
    fn particle_outside_world_respawns_despite_young_age() {
        let w = world();
        let p = Particle::new(w.half_width() + 0.1, 0.0, 1.0);
        let next = advance(&w, &VectorField::default(), Integration::default(), p, &mut rng());

        assert!(w.contains(next.x, next.y));
        assert!((0.0..5.0).contains(&next.age));
        // An advect would have kept it outside.
        assert!(next.x < w.half_width());
    }

    #[test]
    fn particle_on_boundary_respawns() {
        let w = world();
        let p = Particle::new(0.0, w.half_height(), 0.5);
        let next = advance(&w, &VectorField::default(), Integration::default(), p, &mut rng());
        assert!(w.contains(next.x, next.y));
    }

    #[test]
    fn particle_advected_out_of_world_respawns() {
        // Uniform flow to +x, pushing the particle through the right edge.
        let outward = VectorField {
            name: "outward".into(),
            fx: "1.0".into(),
            fy: "0.0".into(),
            eval: |_, _| (1.0, 0.0),
        };
        let w = world();
        let p = Particle::new(w.half_width() - 0.005, 0.0, 1.0);
        let next = advance(&w, &outward, Integration::default(), p, &mut rng());
        assert!(w.contains(next.x, next.y));
        assert_ne!(next.age, 1.0 + 0.01);
    }

    // ── invariants over many ticks ────────────────────────────────────────

    #[test]
    fn small_population_scenario_keeps_invariants() {
        let w = world();
        let integ = Integration::default();
        let mut r = rng();
        let mut ps = vec![
            Particle::new(0.0, 0.0, 4.995),
            Particle::new(w.half_width() + 0.1, 0.0, 1.0),
            Particle::new(-3.0, 2.0, 0.0),
            Particle::new(5.0, -5.0, 2.5),
        ];

        step_all(&w, &VectorField::default(), integ, &mut ps, &mut r);
        for p in &ps {
            assert!(p.age >= 0.0 && p.age < integ.max_age, "{p:?}");
            assert!(w.contains(p.x, p.y), "{p:?}");
        }
    }

    #[test]
    fn age_and_position_invariants_hold_across_ticks() {
        let w = world();
        let integ = Integration::default();
        let mut r = rng();
        let mut ps = crate::sim::particle::populate(&w, 512, integ.max_age, &mut r);

        for _ in 0..1_000 {
            step_all(&w, &VectorField::default(), integ, &mut ps, &mut r);
            for p in &ps {
                assert!(p.age >= 0.0 && p.age < integ.max_age, "age out of range: {p:?}");
                assert!(w.contains(p.x, p.y), "position out of world: {p:?}");
            }
        }
    }

    #[test]
    fn shrinking_world_respawns_stranded_particles() {
        let big = World::new(20.0, 20.0);
        let small = World::new(20.0, 5.0);
        let mut ps = vec![Particle::new(0.0, 8.0, 1.0)];
        step_all(&small, &VectorField::default(), Integration::default(), &mut ps, &mut rng());
        assert!(small.contains(ps[0].x, ps[0].y));
        assert!(big.contains(ps[0].x, ps[0].y));
    }

    // ── device kernel source ──────────────────────────────────────────────

    #[test]
    fn kernel_source_substitutes_all_placeholders() {
        let src = kernel_source(&VectorField::default());
        assert!(!src.contains("{{"));
        assert!(src.contains("cos(x * cos(y))"));
        assert!(src.contains("@workgroup_size(64)"));
    }

    #[test]
    fn default_kernel_compiles() {
        let program = compile(&VectorField::default()).unwrap();
        let params = program.uniform_block(0, 0).unwrap();
        for name in ["world", "max_age", "step", "seed", "tick", "count"] {
            assert!(params.has(name), "missing uniform member {name}");
        }
        assert_eq!(params.size(), 32);
    }

    #[test]
    fn malformed_field_expression_fails_to_compile() {
        let broken = VectorField {
            name: "broken".into(),
            fx: "cos(x *".into(),
            fy: "y".into(),
            eval: |x, y| (x, y),
        };
        assert!(compile(&broken).is_err());
    }

    #[test]
    fn max_particles_matches_workgroup_grid() {
        let limits = wgpu::Limits::default();
        let max = max_particles(&limits);
        assert_eq!(workgroups_for(max), limits.max_compute_workgroups_per_dimension);
        assert!(workgroups_for(max + 1) > limits.max_compute_workgroups_per_dimension);
    }

    #[test]
    fn workgroups_cover_every_particle() {
        assert_eq!(workgroups_for(1), 1);
        assert_eq!(workgroups_for(64), 1);
        assert_eq!(workgroups_for(65), 2);
        assert_eq!(workgroups_for(100_000), 1563);
    }

    // ── device kernel on an adapter ───────────────────────────────────────

    /// Any adapter the host offers, software ones included.
    fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok()?;
            adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()
        })
    }

    /// Runs one device tick over `particles` and reads the store back.
    fn device_tick(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        world: &World,
        particles: &[Particle],
        tick: u64,
    ) -> Vec<Particle> {
        let store = ParticleStore::new(device, particles);
        let mut kernel = SimulationKernel::new(
            device,
            &VectorField::default(),
            Integration::default(),
            &store,
            0x5eed,
        )
        .unwrap();

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("advect readback"),
            size: store.byte_size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        kernel.dispatch(queue, &mut encoder, world, tick);
        encoder.copy_buffer_to_buffer(store.buffer(), 0, &readback, 0, store.byte_size());
        queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |r| r.unwrap());
        device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
        let out = bytemuck::cast_slice::<u8, Particle>(&slice.get_mapped_range()).to_vec();
        readback.unmap();
        out
    }

    #[test]
    fn device_kernel_respawns_and_advects() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no wgpu adapter; skipping");
            return;
        };
        let w = world();
        let interior = Particle::new(1.0, 2.0, 1.0);
        let before = [
            Particle::new(0.0, 0.0, 4.995),
            Particle::new(w.half_width() + 0.1, 0.0, 1.0),
            interior,
            Particle::new(-3.0, 2.0, 0.0),
        ];

        let after = device_tick(&device, &queue, &w, &before, 0);
        assert_eq!(after.len(), before.len());

        for p in &after {
            assert!(p.age >= 0.0 && p.age < 5.0, "{p:?}");
            assert!(w.contains(p.x, p.y), "{p:?}");
        }
        assert_ne!(after[0].age, 4.995 + 0.01, "aged-out particle advected");
        assert!(after[1].x < w.half_width(), "outside particle advected");

        // Same rule as `advance`; device trig may differ in the last bits.
        let expected = advance(&w, &VectorField::default(), Integration::default(), interior, &mut rng());
        assert!((after[2].x - expected.x).abs() < 1e-4, "{:?} vs {expected:?}", after[2]);
        assert!((after[2].y - expected.y).abs() < 1e-4, "{:?} vs {expected:?}", after[2]);
        assert_eq!(after[2].age, expected.age);
    }

    #[test]
    fn device_respawns_differ_between_ticks() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no wgpu adapter; skipping");
            return;
        };
        let w = world();
        let dying = [Particle::new(0.0, 0.0, 4.995); 2];

        let a = device_tick(&device, &queue, &w, &dying, 0);
        let b = device_tick(&device, &queue, &w, &dying, 1);
        // Per-particle and per-tick hashing.
        assert_ne!(a[0], a[1]);
        assert_ne!(a[0], b[0]);
    }
}
