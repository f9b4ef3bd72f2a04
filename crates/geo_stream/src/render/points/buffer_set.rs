//! GPU buffers used by the procedural (indirect) draw path
//!
//! Every buffer is sized to exactly what the current frame needs. When the
//! required element count changes the old buffer is released and a new one is
//! created; otherwise the existing buffer is rewritten in place.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::render::api::{BufferDescriptor, BufferHandle, BufferKind, RenderDevice};
use crate::render::RenderResult;

/// Byte stride of one point position (three `f32`)
pub const POINT_STRIDE: usize = std::mem::size_of::<[f32; 3]>();

/// Byte stride of one float-encoded point id
pub const ID_STRIDE: usize = std::mem::size_of::<f32>();

/// Byte stride of one indirect arguments block
pub const ARGS_STRIDE: usize = std::mem::size_of::<IndirectArgs>();

/// Indexed indirect draw arguments, laid out the way the GPU reads them
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectArgs {
    /// Number of indices of the submesh
    pub index_count: u32,
    /// Number of instances to draw
    pub instance_count: u32,
    /// First index in the index buffer
    pub start_index: u32,
    /// Value added to each index
    pub base_vertex: i32,
    /// First instance index
    pub start_instance: u32,
}

impl IndirectArgs {
    /// Arguments drawing a whole submesh `instance_count` times
    pub const fn new(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            start_index: 0,
            base_vertex: 0,
            start_instance: 0,
        }
    }
}

/// A buffer owned by a [`BufferSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffer {
    /// Device handle
    pub handle: BufferHandle,
    /// Element count the buffer was created with
    pub count: usize,
    /// Element stride in bytes
    pub stride: usize,
}

/// Points, ids and per-submesh argument buffers of one renderer
#[derive(Debug, Default)]
pub struct BufferSet {
    points: Option<GpuBuffer>,
    ids: Option<GpuBuffer>,
    args: Vec<GpuBuffer>,
    point_staging: Vec<[f32; 3]>,
    id_staging: Vec<f32>,
}

impl BufferSet {
    /// Create an empty set; nothing is allocated until the first upload
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload point positions, resizing the `points` buffer if the count changed
    pub fn upload_points(
        &mut self,
        device: &mut dyn RenderDevice,
        positions: &[Vec3],
    ) -> RenderResult<BufferHandle> {
        let descriptor = BufferDescriptor {
            label: "points",
            count: positions.len(),
            stride: POINT_STRIDE,
            kind: BufferKind::Structured,
        };
        let handle = ensure_buffer(&mut self.points, device, &descriptor)?;

        self.point_staging.clear();
        self.point_staging
            .extend(positions.iter().map(|p| [p.x, p.y, p.z]));
        device.write_buffer(handle, bytemuck::cast_slice(&self.point_staging))?;

        Ok(handle)
    }

    /// Upload point ids as floats, resizing the `ids` buffer if the count changed
    pub fn upload_ids(&mut self, device: &mut dyn RenderDevice, ids: &[u64]) -> RenderResult<BufferHandle> {
        let descriptor = BufferDescriptor {
            label: "ids",
            count: ids.len(),
            stride: ID_STRIDE,
            kind: BufferKind::Structured,
        };
        let handle = ensure_buffer(&mut self.ids, device, &descriptor)?;

        self.id_staging.clear();
        self.id_staging.extend(ids.iter().map(|&id| id as f32));
        device.write_buffer(handle, bytemuck::cast_slice(&self.id_staging))?;

        Ok(handle)
    }

    /// Drop the `ids` buffer, if any
    pub fn release_ids(&mut self, device: &mut dyn RenderDevice) {
        if let Some(buffer) = self.ids.take() {
            device.release_buffer(buffer.handle);
        }
    }

    /// Write one argument block per submesh
    ///
    /// The argument buffers are recreated only when the submesh count changes.
    pub fn upload_args(&mut self, device: &mut dyn RenderDevice, args: &[IndirectArgs]) -> RenderResult<()> {
        if self.args.len() != args.len() {
            self.release_args(device);
            let descriptor = BufferDescriptor {
                label: "indirect_args",
                count: 1,
                stride: ARGS_STRIDE,
                kind: BufferKind::IndirectArguments,
            };
            for _ in args {
                let handle = device.create_buffer(&descriptor)?;
                self.args.push(GpuBuffer {
                    handle,
                    count: descriptor.count,
                    stride: descriptor.stride,
                });
            }
            log::debug!("Created {} indirect argument buffers", self.args.len());
        }

        for (buffer, block) in self.args.iter().zip(args) {
            device.write_buffer(buffer.handle, bytemuck::bytes_of(block))?;
        }
        Ok(())
    }

    /// Argument buffer of a submesh
    pub fn args_handle(&self, submesh: usize) -> Option<BufferHandle> {
        self.args.get(submesh).map(|buffer| buffer.handle)
    }

    /// Current `points` buffer
    pub const fn points(&self) -> Option<&GpuBuffer> {
        self.points.as_ref()
    }

    /// Current `ids` buffer
    pub const fn ids(&self) -> Option<&GpuBuffer> {
        self.ids.as_ref()
    }

    /// Current argument buffers, one per submesh
    pub fn args(&self) -> &[GpuBuffer] {
        &self.args
    }

    /// Whether no buffer is currently held
    pub fn is_empty(&self) -> bool {
        self.points.is_none() && self.ids.is_none() && self.args.is_empty()
    }

    /// Release every buffer; calling it again is a no-op
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        if self.is_empty() {
            return;
        }
        self.release_args(device);
        if let Some(buffer) = self.points.take() {
            device.release_buffer(buffer.handle);
        }
        self.release_ids(device);
        log::debug!("Released point buffers");
    }

    fn release_args(&mut self, device: &mut dyn RenderDevice) {
        for buffer in self.args.drain(..) {
            device.release_buffer(buffer.handle);
        }
    }
}

/// Return a buffer matching `descriptor`, recreating the slot's buffer if its
/// capacity differs
fn ensure_buffer(
    slot: &mut Option<GpuBuffer>,
    device: &mut dyn RenderDevice,
    descriptor: &BufferDescriptor,
) -> RenderResult<BufferHandle> {
    if let Some(buffer) = slot {
        if buffer.count == descriptor.count && buffer.stride == descriptor.stride {
            return Ok(buffer.handle);
        }
        log::trace!(
            "Resizing {} buffer from {} to {} elements",
            descriptor.label,
            buffer.count,
            descriptor.count
        );
        device.release_buffer(buffer.handle);
        *slot = None;
    }

    let handle = device.create_buffer(descriptor)?;
    *slot = Some(GpuBuffer {
        handle,
        count: descriptor.count,
        stride: descriptor.stride,
    });
    Ok(handle)
}
