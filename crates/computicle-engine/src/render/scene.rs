use crate::device::{ShaderError, ShaderProgram, UniformBlock};
use crate::sim::{Particle, ParticleStore, World};

use super::ctx::RenderCtx;
use super::ring::ActiveTarget;
use super::targets::{TRAIL_FORMAT, TargetSlot};

const SCENE_SHADER: &str = include_str!("shaders/scene.wgsl");

/// Floor for the age tint so particles near the end of their life stay visible.
pub const MIN_INTENSITY: f32 = 0.1;

/// Default particle color (red, fading with age).
pub const DEFAULT_TINT: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Compiles the scene shader.
pub fn compile() -> Result<ShaderProgram, ShaderError> {
    ShaderProgram::compile("computicle scene shader", SCENE_SHADER)
}

/// Draws every particle as a point into the ring's active target.
///
/// Points are blended with `max`, so overlapping points and frames
/// accumulated in the same slot keep the brightest value.
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    params_ubo: wgpu::Buffer,
    params: UniformBlock,
    world: Option<World>,
}

impl SceneRenderer {
    pub fn new(ctx: &RenderCtx<'_>, max_age: f32, tint: [f32; 4]) -> Result<Self, ShaderError> {
        let program = compile()?;
        let mut params = program.uniform_block(0, 0)?;
        params.set("tint", &tint);
        params.set("max_age", &max_age);
        params.set("min_intensity", &MIN_INTENSITY);

        let shader = program.create_module(ctx.device);

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("computicle scene bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: params.min_binding_size(),
                    },
                    count: None,
                }],
            });

        let pipeline_layout =
            ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("computicle scene pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("computicle scene pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Particle::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TRAIL_FORMAT,
                    blend: Some(max_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let params_ubo = params.create_buffer(ctx.device);

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("computicle scene bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_ubo.as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            bind_group,
            params_ubo,
            params,
            world: None,
        })
    }

    /// Recomputes the projection if `world` differs from the last one seen.
    pub fn set_world(&mut self, world: &World) {
        if self.world.as_ref() == Some(world) {
            return;
        }
        self.params.set("mvp", &world.view_projection().to_cols_array());
        self.world = Some(*world);
    }

    /// Records the scene pass into the active target.
    ///
    /// The target is cleared first when it has just become active; otherwise
    /// this frame's points land on top of what the slot already holds.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target: ActiveTarget<'_, TargetSlot>,
        store: &ParticleStore,
    ) {
        debug_assert!(self.world.is_some(), "set_world before draw");
        self.params.flush(ctx.queue, &self.params_ubo);

        let load = if target.clear {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            wgpu::LoadOp::Load
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("computicle scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.slot.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, store.buffer().slice(..));
        rpass.draw(0..store.len(), 0..1);
    }
}

fn max_blend() -> wgpu::BlendState {
    let max = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Max,
    };
    wgpu::BlendState {
        color: max,
        alpha: max,
    }
}
