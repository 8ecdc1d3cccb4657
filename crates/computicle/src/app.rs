use std::time::Instant;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use computicle_engine::config::SimConfig;
use computicle_engine::core::{App, AppControl, FrameCtx, InitCtx};
use computicle_engine::input::{InputFrame, Key};
use computicle_engine::render::{
    Compositor, RenderCtx, SceneRenderer, SurfaceTarget, TargetRing, TrailTargets,
};
use computicle_engine::sim::{populate, FixedRateScheduler, ParticleStore, SimulationKernel, World};
use computicle_engine::time::RateCounter;

/// What a key press asks the main loop to do.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    Exit,
    TogglePause,
    Repopulate,
}

/// Commands for this frame's key presses. `Exit` comes first when present.
pub fn commands(input: &InputFrame) -> Vec<Command> {
    if input.pressed(Key::Escape) {
        return vec![Command::Exit];
    }
    let mut out = Vec::new();
    if input.pressed(Key::Space) {
        out.push(Command::TogglePause);
    }
    if input.pressed(Key::R) {
        out.push(Command::Repopulate);
    }
    out
}

/// Work that came due this iteration.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Due {
    /// Simulation tick to dispatch.
    pub tick: Option<u64>,
    /// Whether the ring rotated.
    pub rotated: bool,
}

/// Scheduler check, then ring rotation.
///
/// Runs once per iteration before the surface is acquired, so neither
/// depends on a frame being presented.
pub fn poll_due<T>(scheduler: &mut FixedRateScheduler, ring: &mut TargetRing<T>, now: Instant) -> Due {
    let tick = scheduler.poll(now);
    let rotated = ring.tick(now);
    Due { tick, rotated }
}

/// The particle-trail application.
///
/// Everything the main loop touches lives in `Trails`, built in `on_init`;
/// each phase of a frame is one method on it, called in a fixed order.
pub struct TrailApp {
    config: SimConfig,
    trails: Option<Trails>,
}

impl TrailApp {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            trails: None,
        }
    }
}

struct Trails {
    config: SimConfig,
    world: World,
    rng: StdRng,

    store: ParticleStore,
    kernel: SimulationKernel,
    scheduler: FixedRateScheduler,

    targets: TrailTargets,
    scene: SceneRenderer,
    compositor: Compositor,

    frames: RateCounter,
    ticks: RateCounter,
}

impl App for TrailApp {
    fn on_init(&mut self, ctx: &mut InitCtx<'_, '_>) -> anyhow::Result<()> {
        let config = self.config.clone();
        let size = ctx.gpu.size();
        let device = ctx.gpu.device();

        let world = World::for_surface(config.world_width, size.width, size.height);
        log::info!("world: {} x {}", world.width(), world.height());

        // Seeded once; the device kernel derives per-tick randomness from the
        // tick index.
        let mut rng = StdRng::from_entropy();
        let particles = populate(&world, config.particle_count as usize, config.max_age, &mut rng);
        let store = ParticleStore::new(device, &particles);

        let kernel = SimulationKernel::new(
            device,
            &config.field,
            config.integration(),
            &store,
            rng.next_u32(),
        )
        .context("failed to build the simulation kernel")?;

        let targets = TrailTargets::new(
            device,
            size.width,
            size.height,
            config.ring_size,
            config.rotate_hz,
            ctx.now,
        )
        .context("failed to create trail render targets")?;

        let rctx = ctx.render_ctx();
        let mut scene = SceneRenderer::new(&rctx, config.max_age, config.tint)
            .context("failed to build the scene renderer")?;
        scene.set_world(&world);
        let compositor = Compositor::new(&rctx).context("failed to build the compositor")?;

        log::info!(
            "simulation: {} ups max, ring of {} rotating at {} Hz",
            config.max_ups,
            config.ring_size,
            config.rotate_hz
        );

        self.trails = Some(Trails {
            scheduler: FixedRateScheduler::new(config.max_ups, ctx.now),
            frames: RateCounter::per_second(ctx.now),
            ticks: RateCounter::per_second(ctx.now),
            config,
            world,
            rng,
            store,
            kernel,
            targets,
            scene,
            compositor,
        });
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(trails) = self.trails.as_mut() else {
            return AppControl::Continue;
        };
        let now = ctx.now;

        trails.sync_surface(ctx.gpu.device(), ctx.surface_size());

        if trails.handle_commands(ctx.input_frame, ctx.gpu.queue(), now) == AppControl::Exit {
            return AppControl::Exit;
        }

        let mut pending = trails.poll_due(now).tick;

        let control = ctx.render(|rctx, target| {
            if let Some(tick) = pending.take() {
                trails.simulate(rctx, target.encoder, tick);
            }
            trails.draw_scene(rctx, target.encoder);
            trails.composite(rctx, target);
        });

        // No frame this iteration; the tick still runs.
        if let Some(tick) = pending {
            trails.simulate_unpresented(&RenderCtx::of(ctx.gpu), tick);
        }

        trails.report(now);
        control
    }
}

impl Trails {
    // ── phases, in main-loop order ─────────────────────────────────────────

    /// Follows the surface size: world height and target extent.
    fn sync_surface(&mut self, device: &wgpu::Device, (width, height): (u32, u32)) {
        let before = self.world;
        if !self.world.fit_surface(width, height) {
            return;
        }
        if self.world != before {
            log::debug!("world resized to {} x {}", self.world.width(), self.world.height());
        }
        self.scene.set_world(&self.world);

        if let Err(err) = self.targets.resize(device, width, height) {
            let (w, h) = self.targets.size();
            log::warn!("{err}; keeping {w}x{h} targets");
        }
    }

    fn handle_commands(&mut self, input: &InputFrame, queue: &wgpu::Queue, now: Instant) -> AppControl {
        for command in commands(input) {
            match command {
                Command::Exit => return AppControl::Exit,
                Command::TogglePause => {
                    let paused = !self.scheduler.is_paused();
                    self.scheduler.set_paused(paused, now);
                    log::info!("simulation {}", if paused { "paused" } else { "resumed" });
                }
                Command::Repopulate => {
                    let particles = populate(
                        &self.world,
                        self.store.len() as usize,
                        self.config.max_age,
                        &mut self.rng,
                    );
                    self.store.upload(queue, &particles);
                    log::info!("repopulated {} particles", particles.len());
                }
            }
        }
        AppControl::Continue
    }

    fn poll_due(&mut self, now: Instant) -> Due {
        let due = poll_due(&mut self.scheduler, self.targets.ring_mut(), now);
        if due.rotated {
            log::trace!("ring rotated ({})", self.targets.ring().rotations());
        }
        due
    }

    fn simulate(&mut self, rctx: &RenderCtx<'_>, encoder: &mut wgpu::CommandEncoder, tick: u64) {
        self.kernel.dispatch(rctx.queue, encoder, &self.world, tick);
        self.ticks.record(1);
    }

    /// Runs `tick` in its own submission when no surface frame was acquired.
    fn simulate_unpresented(&mut self, rctx: &RenderCtx<'_>, tick: u64) {
        let mut encoder = rctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("computicle tick encoder"),
        });
        self.simulate(rctx, &mut encoder, tick);
        rctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_scene(&mut self, rctx: &RenderCtx<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = self.targets.draw_into_active();
        self.scene.draw(rctx, encoder, target, &self.store);
    }

    fn composite(&mut self, rctx: &RenderCtx<'_>, target: &mut SurfaceTarget<'_>) {
        self.compositor.draw(rctx, target, &self.targets);
        self.frames.record(1);
    }

    fn report(&mut self, now: Instant) {
        let Some(fps) = self.frames.sample(now) else { return };
        let ups = self.ticks.sample(now).unwrap_or_default();
        log::debug!(
            "{fps:.1} fps, {ups:.1} ups, {} ticks, {} dropped, {} rotations",
            self.scheduler.ticks(),
            self.scheduler.dropped(),
            self.targets.ring().rotations()
        );
    }
}
