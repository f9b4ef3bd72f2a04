//! Test doubles shared by the unit tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use crate::core::ShaderSlots;
use crate::foundation::math::{Bounds, Mat4};
use crate::render::api::{
    BufferDescriptor, BufferHandle, DrawMesh, DrawMeshIndirect, DrawMeshInstanced, MaterialHandle,
    PropertyBlock, RenderCapabilities, RenderDevice,
};
use crate::render::{RenderError, RenderResult};
use crate::source::{SampleRequest, SourceError, SourceResult, StreamDescriptor, StreamHandle, StreamSource};

/// Everything a [`RecordingDevice`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(BufferDescriptor, BufferHandle),
    WriteBuffer(BufferHandle, usize),
    ReleaseBuffer(BufferHandle),
    SetFloat {
        material: MaterialHandle,
        name: String,
        value: f32,
    },
    SetBuffer {
        material: MaterialHandle,
        name: String,
        buffer: BufferHandle,
    },
    SetKeyword {
        material: MaterialHandle,
        keyword: String,
        enabled: bool,
    },
    DrawMesh {
        submesh: usize,
        material: MaterialHandle,
        matrix: Mat4,
    },
    DrawInstanced {
        submesh: usize,
        material: MaterialHandle,
        count: usize,
        properties: Option<PropertyBlock>,
    },
    DrawIndirect {
        submesh: usize,
        material: MaterialHandle,
        bounds: Bounds,
        args: BufferHandle,
    },
}

/// Headless device keeping buffer contents in memory and logging every call
#[derive(Debug, Default)]
pub struct RecordingDevice {
    capabilities: RenderCapabilities,
    calls: Vec<DeviceCall>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    keywords: HashSet<(MaterialHandle, String)>,
    next_handle: u64,
    created: usize,
    released: usize,
    fail_create: bool,
}

impl RecordingDevice {
    /// Device supporting every capability
    pub fn new() -> Self {
        Self::with_capabilities(RenderCapabilities::all())
    }

    pub fn with_capabilities(capabilities: RenderCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Make every following `create_buffer` fail
    pub fn fail_buffer_creation(&mut self, fail: bool) {
        self.fail_create = fail;
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn created_buffers(&self) -> usize {
        self.created
    }

    pub fn released_buffers(&self) -> usize {
        self.released
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_bytes(&self, handle: BufferHandle) -> &[u8] {
        self.buffers.get(&handle).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn buffer_f32(&self, handle: BufferHandle) -> Vec<f32> {
        self.buffer_bytes(handle)
            .chunks_exact(4)
            .map(|word| f32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect()
    }

    pub fn buffer_u32(&self, handle: BufferHandle) -> Vec<u32> {
        self.buffer_bytes(handle)
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect()
    }

    pub fn draw_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    DeviceCall::DrawMesh { .. } | DeviceCall::DrawInstanced { .. } | DeviceCall::DrawIndirect { .. }
                )
            })
            .count()
    }

    pub fn instanced_batch_sizes(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawInstanced { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    /// Ids attached to every instanced draw under the default slot name
    pub fn instanced_ids(&self) -> Vec<Option<Vec<f32>>> {
        let slot = ShaderSlots::default().point_ids;
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawInstanced { properties, .. } => Some(
                    properties
                        .as_ref()
                        .and_then(|block| block.float_array(&slot))
                        .map(<[f32]>::to_vec),
                ),
                _ => None,
            })
            .collect()
    }

    pub fn indirect_bounds(&self) -> Vec<Bounds> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawIndirect { bounds, .. } => Some(*bounds),
                _ => None,
            })
            .collect()
    }

    pub fn immediate_matrices(&self) -> Vec<Mat4> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawMesh { matrix, .. } => Some(*matrix),
                _ => None,
            })
            .collect()
    }
}

impl RenderDevice for RecordingDevice {
    fn capabilities(&self) -> RenderCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> RenderResult<BufferHandle> {
        if self.fail_create {
            return Err(RenderError::ResourceCreationFailed(format!(
                "{} buffer of {} bytes",
                descriptor.label,
                descriptor.size_in_bytes()
            )));
        }
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.buffers.insert(handle, vec![0; descriptor.size_in_bytes()]);
        self.created += 1;
        self.calls.push(DeviceCall::CreateBuffer(*descriptor, handle));
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
        let contents = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::UploadFailed(format!("unknown buffer {buffer:?}")))?;
        contents.clear();
        contents.extend_from_slice(data);
        self.calls.push(DeviceCall::WriteBuffer(buffer, data.len()));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.released += 1;
        }
        self.calls.push(DeviceCall::ReleaseBuffer(buffer));
    }

    fn set_material_float(&mut self, material: MaterialHandle, name: &str, value: f32) {
        self.calls.push(DeviceCall::SetFloat {
            material,
            name: name.to_string(),
            value,
        });
    }

    fn set_material_buffer(&mut self, material: MaterialHandle, name: &str, buffer: BufferHandle) {
        self.calls.push(DeviceCall::SetBuffer {
            material,
            name: name.to_string(),
            buffer,
        });
    }

    fn set_material_keyword(&mut self, material: MaterialHandle, keyword: &str, enabled: bool) {
        if enabled {
            self.keywords.insert((material, keyword.to_string()));
        } else {
            self.keywords.remove(&(material, keyword.to_string()));
        }
        self.calls.push(DeviceCall::SetKeyword {
            material,
            keyword: keyword.to_string(),
            enabled,
        });
    }

    fn is_material_keyword_enabled(&self, material: MaterialHandle, keyword: &str) -> bool {
        self.keywords.contains(&(material, keyword.to_string()))
    }

    fn draw_mesh(&mut self, draw: &DrawMesh<'_>) -> RenderResult<()> {
        self.calls.push(DeviceCall::DrawMesh {
            submesh: draw.submesh,
            material: draw.material,
            matrix: draw.matrix,
        });
        Ok(())
    }

    fn draw_mesh_instanced(&mut self, draw: &DrawMeshInstanced<'_>) -> RenderResult<()> {
        self.calls.push(DeviceCall::DrawInstanced {
            submesh: draw.submesh,
            material: draw.material,
            count: draw.matrices.len(),
            properties: draw.properties.cloned(),
        });
        Ok(())
    }

    fn draw_mesh_instanced_indirect(&mut self, draw: &DrawMeshIndirect<'_>) -> RenderResult<()> {
        if !self.buffers.contains_key(&draw.args) {
            return Err(RenderError::RenderingFailed(format!("unknown argument buffer {:?}", draw.args)));
        }
        self.calls.push(DeviceCall::DrawIndirect {
            submesh: draw.submesh,
            material: draw.material,
            bounds: draw.bounds,
            args: draw.args,
        });
        Ok(())
    }
}

/// Shared state of a [`ScriptedSource`] and every handle it opened
#[derive(Debug, Default)]
pub struct Script {
    pub time_range: (f64, f64),
    /// Every open fails while set
    pub fail_open: bool,
    /// Number of upcoming sample requests to reject
    pub reject_requests: usize,
    /// `create_missing_nodes` of every open attempt
    pub opens: Vec<bool>,
    /// `(time, async_hint)` of every sample request
    pub requests: Vec<(f64, bool)>,
    pub motion_scales: Vec<f32>,
    pub finalized: usize,
    pub closed: usize,
}

/// Source whose behaviour is scripted by the test
#[derive(Debug)]
pub struct ScriptedSource {
    script: Rc<RefCell<Script>>,
}

impl ScriptedSource {
    pub fn new(time_range: (f64, f64)) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                time_range,
                ..Script::default()
            })),
        }
    }

    /// Shared script, kept by the test after the source moved into a player
    pub fn script(&self) -> Rc<RefCell<Script>> {
        Rc::clone(&self.script)
    }
}

impl StreamSource for ScriptedSource {
    type Handle = ScriptedHandle;

    fn open(&mut self, descriptor: &StreamDescriptor, create_missing_nodes: bool) -> SourceResult<ScriptedHandle> {
        let mut script = self.script.borrow_mut();
        script.opens.push(create_missing_nodes);
        if script.fail_open {
            return Err(SourceError::NotFound(PathBuf::from(descriptor.path())));
        }
        Ok(ScriptedHandle {
            script: Rc::clone(&self.script),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedHandle {
    script: Rc<RefCell<Script>>,
}

impl StreamHandle for ScriptedHandle {
    fn time_range(&self) -> (f64, f64) {
        self.script.borrow().time_range
    }

    fn set_vertex_motion_scale(&mut self, scale: f32) {
        self.script.borrow_mut().motion_scales.push(scale);
    }

    fn request_sample(&mut self, time: f64, async_hint: bool) -> SampleRequest {
        let mut script = self.script.borrow_mut();
        script.requests.push((time, async_hint));
        if script.reject_requests > 0 {
            script.reject_requests -= 1;
            SampleRequest::Rejected
        } else {
            SampleRequest::Accepted
        }
    }

    fn finalize_sample(&mut self) {
        self.script.borrow_mut().finalized += 1;
    }

    fn close(&mut self) {
        self.script.borrow_mut().closed += 1;
    }
}
