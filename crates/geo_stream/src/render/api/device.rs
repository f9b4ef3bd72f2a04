//! Device abstraction traits for the point renderer
//!
//! This module defines the contract a rendering device must implement so the
//! instanced point renderer can allocate buffers, bind material parameters and
//! issue the three kinds of draw call it needs, without knowing which graphics
//! API sits underneath.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::RenderCapabilities;
use crate::foundation::math::{Bounds, Mat4};
use crate::render::RenderResult;

/// Handle to a GPU buffer owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a mesh resource stored in the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a material resource stored in the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// How a buffer is going to be consumed by the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Structured data read by shaders (points, ids)
    Structured,
    /// Arguments block consumed by an indirect draw
    IndirectArguments,
}

/// Parameters for buffer creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Debug label
    pub label: &'static str,
    /// Number of elements
    pub count: usize,
    /// Size of one element in bytes
    pub stride: usize,
    /// Intended usage
    pub kind: BufferKind,
}

impl BufferDescriptor {
    /// Total size in bytes
    pub const fn size_in_bytes(&self) -> usize {
        self.count * self.stride
    }
}

/// Shadow casting mode forwarded to every draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowCasting {
    /// Does not cast shadows
    #[default]
    Off,
    /// Casts shadows
    On,
    /// Casts shadows from both faces
    TwoSided,
    /// Invisible, but still casts shadows
    ShadowsOnly,
}

/// Per-renderer draw state shared by every call it issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawSettings {
    /// Shadow casting mode
    pub shadow_casting: ShadowCasting,
    /// Whether the instances receive shadows
    pub receive_shadows: bool,
    /// Render layer
    pub layer: u32,
}

/// Per-draw material parameter overrides
///
/// Each instanced batch owns one block so the id array staged for one batch is
/// never overwritten by the next batch before the device consumes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBlock {
    float_arrays: HashMap<String, Vec<f32>>,
}

impl PropertyBlock {
    /// Create an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the float array stored under `name`, reusing its allocation
    pub fn set_float_array(&mut self, name: &str, values: &[f32]) {
        match self.float_arrays.get_mut(name) {
            Some(slot) => {
                slot.clear();
                slot.extend_from_slice(values);
            }
            None => {
                self.float_arrays.insert(name.to_owned(), values.to_vec());
            }
        }
    }

    /// Float array stored under `name`
    pub fn float_array(&self, name: &str) -> Option<&[f32]> {
        self.float_arrays.get(name).map(Vec::as_slice)
    }

    /// Remove every override
    pub fn clear(&mut self) {
        self.float_arrays.clear();
    }

    /// Whether the block holds no overrides
    pub fn is_empty(&self) -> bool {
        self.float_arrays.is_empty()
    }
}

/// A single non-instanced draw
#[derive(Debug, Clone, Copy)]
pub struct DrawMesh<'a> {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Submesh index
    pub submesh: usize,
    /// Material bound for the draw
    pub material: MaterialHandle,
    /// Object-to-world matrix
    pub matrix: Mat4,
    /// Shared draw state
    pub settings: &'a DrawSettings,
}

/// A CPU-batched instanced draw
#[derive(Debug, Clone, Copy)]
pub struct DrawMeshInstanced<'a> {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Submesh index
    pub submesh: usize,
    /// Material bound for the draw
    pub material: MaterialHandle,
    /// One object-to-world matrix per instance
    pub matrices: &'a [Mat4],
    /// Optional per-batch overrides
    pub properties: Option<&'a PropertyBlock>,
    /// Shared draw state
    pub settings: &'a DrawSettings,
}

/// A GPU-driven instanced draw whose arguments live in a buffer
#[derive(Debug, Clone, Copy)]
pub struct DrawMeshIndirect<'a> {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Submesh index
    pub submesh: usize,
    /// Material bound for the draw
    pub material: MaterialHandle,
    /// World-space culling bounds of every instance
    pub bounds: Bounds,
    /// Buffer holding the draw arguments
    pub args: BufferHandle,
    /// Byte offset of the arguments inside `args`
    pub args_offset: u64,
    /// Shared draw state
    pub settings: &'a DrawSettings,
}

/// Rendering device trait
///
/// Abstracts over concrete graphics APIs and provides the small surface the point
/// renderer drives every frame.
pub trait RenderDevice {
    /// Feature tiers available on this device
    fn capabilities(&self) -> RenderCapabilities;

    /// Create a buffer of `count * stride` bytes
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> RenderResult<BufferHandle>;

    /// Overwrite the contents of a buffer from the start
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()>;

    /// Release a buffer; the handle must not be used afterwards
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Bind a named float parameter on a material
    fn set_material_float(&mut self, material: MaterialHandle, name: &str, value: f32);

    /// Bind a named buffer parameter on a material
    fn set_material_buffer(&mut self, material: MaterialHandle, name: &str, buffer: BufferHandle);

    /// Enable or disable a shader keyword on a material
    fn set_material_keyword(&mut self, material: MaterialHandle, keyword: &str, enabled: bool);

    /// Whether a shader keyword is currently enabled on a material
    fn is_material_keyword_enabled(&self, material: MaterialHandle, keyword: &str) -> bool;

    /// Record a single draw
    fn draw_mesh(&mut self, draw: &DrawMesh<'_>) -> RenderResult<()>;

    /// Record a CPU-batched instanced draw
    fn draw_mesh_instanced(&mut self, draw: &DrawMeshInstanced<'_>) -> RenderResult<()>;

    /// Record an indirect instanced draw
    fn draw_mesh_instanced_indirect(&mut self, draw: &DrawMeshIndirect<'_>) -> RenderResult<()>;
}
