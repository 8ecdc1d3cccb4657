use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::device::{ShaderError, ShaderProgram, UniformBlock};

use super::ctx::{RenderCtx, SurfaceTarget};
use super::targets::TrailTargets;

const COMPOSITE_SHADER: &str = include_str!("shaders/composite.wgsl");

/// Largest ring the composite shader can sample.
pub const MAX_RING_SIZE: usize = 32;

/// Compiles the composite shader.
pub fn compile() -> Result<ShaderProgram, ShaderError> {
    ShaderProgram::compile("computicle composite shader", COMPOSITE_SHADER)
}

/// Weight of the slot at ring `position` in a ring of `len` slots.
///
/// Position 0 is the slot being written this frame and shows at full
/// strength. Position 1 holds the oldest frame and the weights rise towards
/// the back of the ring, so trails fade with age.
pub fn slot_weight(position: usize, len: usize) -> f32 {
    debug_assert!(position < len);
    if position == 0 {
        1.0
    } else {
        position as f32 / len as f32
    }
}

/// Per-slot `(layer, weight, 0, 0)` entries in ring order.
pub fn slot_table(layers: impl IntoIterator<Item = u32>, len: usize) -> Vec<[f32; 4]> {
    layers
        .into_iter()
        .enumerate()
        .map(|(position, layer)| [layer as f32, slot_weight(position, len), 0.0, 0.0])
        .collect()
}

/// Blends every ring slot into the presentation surface with one
/// full-screen quad.
pub struct Compositor {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad_vbo: wgpu::Buffer,

    params_ubo: wgpu::Buffer,
    params: UniformBlock,

    bind_group: Option<wgpu::BindGroup>,
    bound_generation: Option<u64>,
}

impl Compositor {
    pub fn new(ctx: &RenderCtx<'_>) -> Result<Self, ShaderError> {
        let program = compile()?;
        let params = program.uniform_block(0, 0)?;
        let shader = program.create_module(ctx.device);

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("computicle composite bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: params.min_binding_size(),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2Array,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout =
            ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("computicle composite pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("computicle composite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
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

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("computicle trail sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("computicle composite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let params_ubo = params.create_buffer(ctx.device);

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
            quad_vbo,
            params_ubo,
            params,
            bind_group: None,
            bound_generation: None,
        })
    }

    /// Clears `target` and draws the weighted sum of every ring slot into it.
    pub fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut SurfaceTarget<'_>, targets: &TrailTargets) {
        debug_assert!(targets.len() <= MAX_RING_SIZE);

        self.ensure_bind_group(ctx, targets);
        self.write_params(ctx, targets);

        let Some(bind_group) = self.bind_group.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("computicle composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
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
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }

    // ── private helpers ────────────────────────────────────────────────────

    /// Rebinds the sampled view after the targets were reallocated.
    fn ensure_bind_group(&mut self, ctx: &RenderCtx<'_>, targets: &TrailTargets) {
        if self.bound_generation == Some(targets.generation()) && self.bind_group.is_some() {
            return;
        }

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("computicle composite bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(targets.sampled_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bound_generation = Some(targets.generation());
    }

    fn write_params(&mut self, ctx: &RenderCtx<'_>, targets: &TrailTargets) {
        let table = slot_table(targets.layer_order(), targets.len());
        self.params.set("count", &(table.len() as u32));
        self.params.set_slice("slots", &table);
        self.params.flush(ctx.queue, &self.params_ubo);
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles covering clip space. Texture rows run top-down, so clip
/// `y = 1` maps to `v = 0`.
const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
];

#[cfg(test)]
mod tests {
    use super::*;

    // ── weights ───────────────────────────────────────────────────────────

    #[test]
    fn active_slot_has_full_weight() {
        assert_eq!(slot_weight(0, 20), 1.0);
        assert_eq!(slot_weight(0, 1), 1.0);
    }

    #[test]
    fn oldest_slot_has_lowest_weight() {
        let k = 20;
        let weights: Vec<f32> = (1..k).map(|i| slot_weight(i, k)).collect();
        assert_eq!(weights[0], 1.0 / 20.0);
        assert!(weights.windows(2).all(|w| w[0] < w[1]));
        assert!(weights.iter().all(|&w| w < 1.0));
    }

    #[test]
    fn slot_table_follows_ring_order() {
        let table = slot_table([1, 2, 0], 3);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0], [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(table[1], [2.0, 1.0 / 3.0, 0.0, 0.0]);
        assert_eq!(table[2], [0.0, 2.0 / 3.0, 0.0, 0.0]);
    }

    // ── shader ────────────────────────────────────────────────────────────

    #[test]
    fn composite_shader_compiles() {
        assert!(compile().is_ok());
    }

    #[test]
    fn composite_uniforms_fit_max_ring() {
        let mut params = compile().unwrap().uniform_block(0, 0).unwrap();
        assert!(params.has("count"));
        // 16-byte header + 32 × vec4.
        assert_eq!(params.size(), 16 + 16 * MAX_RING_SIZE as u64);

        let full = slot_table(0..MAX_RING_SIZE as u32, MAX_RING_SIZE);
        assert!(params.set_slice("slots", &full));
    }

    #[test]
    fn quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[1]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
    }
}
