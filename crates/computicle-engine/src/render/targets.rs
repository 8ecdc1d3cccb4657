use std::fmt;
use std::time::Instant;

use super::ring::{ActiveTarget, TargetRing};

/// Color format of every trail target.
pub const TRAIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A render target could not be created at the requested extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    ZeroExtent { width: u32, height: u32 },
    TooLarge { width: u32, height: u32, max: u32 },
    TooManyLayers { layers: u32, max: u32 },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::ZeroExtent { width, height } => {
                write!(f, "render target {width}x{height} has zero area")
            }
            TargetError::TooLarge { width, height, max } => {
                write!(f, "render target {width}x{height} exceeds device limit {max}")
            }
            TargetError::TooManyLayers { layers, max } => {
                write!(f, "{layers} render targets exceed device layer limit {max}")
            }
        }
    }
}

impl std::error::Error for TargetError {}

/// Checks a target extent against device limits.
pub fn check_extent(
    limits: &wgpu::Limits,
    width: u32,
    height: u32,
    layers: u32,
) -> Result<(), TargetError> {
    if width == 0 || height == 0 {
        return Err(TargetError::ZeroExtent { width, height });
    }
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        return Err(TargetError::TooLarge { width, height, max });
    }
    if layers > limits.max_texture_array_layers {
        return Err(TargetError::TooManyLayers {
            layers,
            max: limits.max_texture_array_layers,
        });
    }
    Ok(())
}

/// One ring slot: the layer it owns and a render view onto that layer.
#[derive(Debug)]
pub struct TargetSlot {
    pub layer: u32,
    pub view: wgpu::TextureView,
}

/// The trail targets: a layered texture, one layer per ring slot.
///
/// The compositor samples every layer through `sampled_view`; the scene
/// renderer draws into the active slot's `view`.
pub struct TrailTargets {
    texture: wgpu::Texture,
    sampled_view: wgpu::TextureView,
    ring: TargetRing<TargetSlot>,
    width: u32,
    height: u32,
    generation: u64,
}

impl TrailTargets {
    /// Creates `count` targets of `width x height`.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        count: u32,
        rotate_hz: f64,
        now: Instant,
    ) -> Result<Self, TargetError> {
        check_extent(&device.limits(), width, height, count)?;

        let texture = create_texture(device, width, height, count);
        let sampled_view = create_sampled_view(&texture);
        let slots = (0..count)
            .map(|layer| TargetSlot {
                layer,
                view: create_layer_view(&texture, layer),
            })
            .collect();

        log::info!("trail targets: {count} x {width}x{height} {TRAIL_FORMAT:?}");

        Ok(Self {
            texture,
            sampled_view,
            ring: TargetRing::new(slots, rotate_hz, now),
            width,
            height,
            generation: 0,
        })
    }

    /// Reallocates every layer at a new extent.
    ///
    /// Slot order and each slot's layer are preserved; contents are not.
    /// On error the previous texture stays in place at its old extent.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), TargetError> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let layers = self.ring.len() as u32;
        check_extent(&device.limits(), width, height, layers)?;

        let texture = create_texture(device, width, height, layers);
        for slot in self.ring.iter_mut() {
            slot.view = create_layer_view(&texture, slot.layer);
        }
        self.sampled_view = create_sampled_view(&texture);
        self.texture = texture;

        self.width = width;
        self.height = height;
        self.generation += 1;

        log::debug!("trail targets resized to {width}x{height}");
        Ok(())
    }

    /// The ring, for the per-iteration rotation check.
    pub fn ring_mut(&mut self) -> &mut TargetRing<TargetSlot> {
        &mut self.ring
    }

    pub fn draw_into_active(&mut self) -> ActiveTarget<'_, TargetSlot> {
        self.ring.draw_into_active()
    }

    /// Layers in ring order, active first.
    pub fn layer_order(&self) -> impl Iterator<Item = u32> + '_ {
        self.ring.iter().map(|s| s.layer)
    }

    pub fn ring(&self) -> &TargetRing<TargetSlot> {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn sampled_view(&self) -> &wgpu::TextureView {
        &self.sampled_view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bumped whenever the underlying texture is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn create_texture(device: &wgpu::Device, width: u32, height: u32, layers: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("computicle trail targets"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TRAIL_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn create_layer_view(texture: &wgpu::Texture, layer: u32) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("computicle trail target layer"),
        dimension: Some(wgpu::TextureViewDimension::D2),
        base_array_layer: layer,
        array_layer_count: Some(1),
        ..Default::default()
    })
}

fn create_sampled_view(texture: &wgpu::Texture) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("computicle trail targets (sampled)"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    })
}
