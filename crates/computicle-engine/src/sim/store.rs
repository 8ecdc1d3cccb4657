use wgpu::util::DeviceExt;

use super::particle::Particle;

/// Device-resident particle buffer.
///
/// Bound read-write as storage by the simulation kernel and read as a vertex
/// buffer by the scene renderer. The particle count is fixed at construction.
pub struct ParticleStore {
    buffer: wgpu::Buffer,
    len: u32,
}

impl ParticleStore {
    /// Uploads `particles` into a new buffer.
    pub fn new(device: &wgpu::Device, particles: &[Particle]) -> Self {
        debug_assert!(!particles.is_empty());
        debug_assert!(particles.len() <= u32::MAX as usize);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("computicle particle store"),
            contents: bytemuck::cast_slice(particles),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        log::info!(
            "particle store: {} particles ({} KiB)",
            particles.len(),
            std::mem::size_of_val(particles) / 1024
        );

        Self {
            buffer,
            len: particles.len() as u32,
        }
    }

    /// Overwrites every slot. `particles.len()` must equal `len()`.
    pub fn upload(&self, queue: &wgpu::Queue, particles: &[Particle]) {
        debug_assert_eq!(particles.len(), self.len as usize, "particle count is fixed");
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(particles));
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the whole store in bytes.
    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.len as u64 * std::mem::size_of::<Particle>() as u64
    }
}
