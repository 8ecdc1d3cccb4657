//! WGSL programs: validation before pipeline creation and reflected uniform blocks.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Failure to turn WGSL source into a usable program.
///
/// Any of these is a fatal setup error: pipelines are never created from
/// source that failed here.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    Parse { label: String, message: String },
    Validation { label: String, message: String },
    MissingUniform { label: String, group: u32, binding: u32 },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Parse { label, message } => {
                write!(f, "{label}: WGSL parse error: {message}")
            }
            ShaderError::Validation { label, message } => {
                write!(f, "{label}: WGSL validation error: {message}")
            }
            ShaderError::MissingUniform { label, group, binding } => {
                write!(f, "{label}: no uniform struct at @group({group}) @binding({binding})")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// Validated WGSL source plus its parsed module, kept for reflection.
pub struct ShaderProgram {
    label: String,
    source: String,
    module: naga::Module,
}

impl ShaderProgram {
    /// Parses and validates `source`.
    pub fn compile(label: impl Into<String>, source: impl Into<String>) -> Result<Self, ShaderError> {
        let label = label.into();
        let source = source.into();

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| ShaderError::Parse {
            label: label.clone(),
            message: e.emit_to_string(&source),
        })?;

        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| ShaderError::Validation {
                label: label.clone(),
                message: e.to_string(),
            })?;

        log::debug!("{label}: shader validated ({} bytes)", source.len());

        Ok(Self { label, source, module })
    }

    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&self.source)),
        })
    }

    /// Reflects the uniform struct bound at `@group(group) @binding(binding)`.
    pub fn uniform_block(&self, group: u32, binding: u32) -> Result<UniformBlock, ShaderError> {
        let missing = || ShaderError::MissingUniform {
            label: self.label.clone(),
            group,
            binding,
        };

        let (_, global) = self
            .module
            .global_variables
            .iter()
            .find(|(_, g)| {
                g.space == naga::AddressSpace::Uniform
                    && g.binding
                        .as_ref()
                        .is_some_and(|b| b.group == group && b.binding == binding)
            })
            .ok_or_else(missing)?;

        let naga::TypeInner::Struct { members, span } = &self.module.types[global.ty].inner else {
            return Err(missing());
        };

        let members = members
            .iter()
            .filter_map(|m| {
                Some(UniformMember {
                    name: m.name.clone()?,
                    offset: m.offset,
                    size: self.module.types[m.ty].inner.size(self.module.to_ctx()),
                })
            })
            .collect();

        Ok(UniformBlock {
            label: format!("{} uniforms", self.label),
            members,
            bytes: vec![0; *span as usize],
            warned: HashSet::new(),
            dirty: true,
        })
    }
}

#[derive(Debug, Clone)]
struct UniformMember {
    name: String,
    offset: u32,
    size: u32,
}

/// CPU staging copy of a uniform struct, addressed by member name.
///
/// Setting a name the shader does not declare is not an error: a warning is
/// logged once for that name and the value has no effect.
#[derive(Debug)]
pub struct UniformBlock {
    label: String,
    members: Vec<UniformMember>,
    bytes: Vec<u8>,
    warned: HashSet<String>,
    dirty: bool,
}

impl UniformBlock {
    /// Size of the uniform struct in bytes (WGSL span, including padding).
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn has(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes `value` into member `name`. Returns whether the member was written.
    pub fn set<T: bytemuck::NoUninit>(&mut self, name: &str, value: &T) -> bool {
        self.set_bytes(name, bytemuck::bytes_of(value))
    }

    /// Writes a leading run of an array member.
    pub fn set_slice<T: bytemuck::NoUninit>(&mut self, name: &str, values: &[T]) -> bool {
        self.set_bytes(name, bytemuck::cast_slice(values))
    }

    fn set_bytes(&mut self, name: &str, data: &[u8]) -> bool {
        let Some(member) = self.members.iter().find(|m| m.name == name) else {
            if self.warned.insert(name.to_string()) {
                log::warn!("{}: could not bind uniform `{name}`", self.label);
            }
            return false;
        };

        if data.len() > member.size as usize {
            if self.warned.insert(name.to_string()) {
                log::warn!(
                    "{}: value for `{name}` is {} bytes, member holds {}",
                    self.label,
                    data.len(),
                    member.size
                );
            }
            return false;
        }

        let start = member.offset as usize;
        let dst = &mut self.bytes[start..start + data.len()];
        if dst != data {
            dst.copy_from_slice(data);
            self.dirty = true;
        }
        true
    }

    /// Creates a uniform buffer sized for this block.
    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: self.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Uploads the staged bytes if anything changed since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        if !self.dirty {
            return;
        }
        queue.write_buffer(buffer, 0, &self.bytes);
        self.dirty = false;
    }

    /// Minimum binding size for bind group layouts.
    pub fn min_binding_size(&self) -> Option<std::num::NonZeroU64> {
        std::num::NonZeroU64::new(self.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
struct Params {
    world: vec2<f32>,
    scale: f32,
    count: u32,
    mvp: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> params: Params;

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let p = params.mvp * vec4<f32>(params.world * params.scale, f32(i + params.count), 1.0);
    return p;
}
"#;

    fn block() -> UniformBlock {
        ShaderProgram::compile("test", SRC)
            .unwrap()
            .uniform_block(0, 0)
            .unwrap()
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn compile_accepts_valid_source() {
        assert!(ShaderProgram::compile("ok", SRC).is_ok());
    }

    #[test]
    fn compile_rejects_syntax_error() {
        let err = ShaderProgram::compile("bad", "fn main( {").err().unwrap();
        assert!(matches!(err, ShaderError::Parse { .. }));
    }

    #[test]
    fn compile_rejects_unknown_identifier() {
        let src = "@compute @workgroup_size(1) fn main() { let a = nope(1.0); }";
        assert!(ShaderProgram::compile("bad", src).is_err());
    }

    // ── reflection ────────────────────────────────────────────────────────

    #[test]
    fn uniform_block_reflects_members_and_span() {
        let b = block();
        assert!(b.has("world"));
        assert!(b.has("mvp"));
        // vec2 + f32 + u32 = 16, mat4 at 16 → 80
        assert_eq!(b.size(), 80);
    }

    #[test]
    fn uniform_block_missing_binding_is_error() {
        let program = ShaderProgram::compile("test", SRC).unwrap();
        assert!(matches!(
            program.uniform_block(0, 3),
            Err(ShaderError::MissingUniform { binding: 3, .. })
        ));
    }

    // ── set ───────────────────────────────────────────────────────────────

    #[test]
    fn set_writes_at_member_offset() {
        let mut b = block();
        assert!(b.set("scale", &2.5f32));
        assert_eq!(&b.bytes()[8..12], &2.5f32.to_ne_bytes());
    }

    #[test]
    fn set_unknown_name_has_no_effect() {
        let mut b = block();
        let before = b.bytes().to_vec();
        assert!(!b.set("missing", &1.0f32));
        assert_eq!(b.bytes(), &before[..]);
    }

    #[test]
    fn set_oversized_value_is_rejected() {
        let mut b = block();
        assert!(!b.set("scale", &[1.0f32, 2.0]));
    }

    #[test]
    fn set_slice_fills_leading_elements() {
        let mut b = block();
        assert!(b.set_slice("world", &[3.0f32, 4.0]));
        assert_eq!(&b.bytes()[0..4], &3.0f32.to_ne_bytes());
        assert_eq!(&b.bytes()[4..8], &4.0f32.to_ne_bytes());
    }
}
