//! Instanced point renderer
//!
//! Draws one mesh per point of a [`PointSet`] using the cheapest path the device
//! supports:
//!
//! - **Procedural**: points uploaded to a GPU buffer, one indirect draw per submesh.
//! - **Instancing**: CPU-built matrices, one draw per submesh per batch of at most
//!   [`MAX_INSTANCES_PER_DRAW`] instances.
//! - **NoInstancing**: one draw per point per submesh.
//!
//! # Usage
//!
//! ```rust,no_run
//! # use geo_stream::render::points::{PointMesh, PointsRenderer, PointSet};
//! # use geo_stream::render::api::{MaterialHandle, MeshHandle, RenderDevice};
//! # use geo_stream::foundation::math::{Bounds, Transform};
//! # use geo_stream::core::PointsRendererConfig;
//! # fn frame(device: &mut dyn RenderDevice, points: &PointSet) {
//! let mut renderer = PointsRenderer::new(PointsRendererConfig::default());
//! renderer.set_mesh(Some(PointMesh::new(MeshHandle(1), vec![36], Bounds::default())));
//! renderer.set_materials(vec![MaterialHandle(1)]);
//!
//! // once per frame, after the stream finalized its sample
//! let outcome = renderer.flush(device, Some(points), &Transform::identity());
//!
//! // on disable / teardown
//! renderer.release(device);
//! # }
//! ```

use crate::core::PointsRendererConfig;
use crate::error::{DegenerateInput, StreamError};
use crate::foundation::math::{translation_scale, Bounds, Transform};
use crate::render::api::{
    DrawMesh, DrawMeshIndirect, DrawMeshInstanced, MaterialHandle, MeshHandle, RenderDevice,
};
use crate::render::{RenderError, RenderResult};

use super::batcher::{batch_count, batch_ranges, InstanceBatcher, MAX_INSTANCES_PER_DRAW};
use super::buffer_set::{BufferSet, IndirectArgs};
use super::point_set::PointSet;
use super::strategy::{select_mode, InstancingMode};

/// The mesh drawn at every point
#[derive(Debug, Clone, PartialEq)]
pub struct PointMesh {
    /// Device mesh
    pub handle: MeshHandle,
    /// Index count of every submesh, in submesh order
    pub submesh_index_counts: Vec<u32>,
    /// Bounds of the mesh in its own space
    pub local_bounds: Bounds,
}

impl PointMesh {
    /// Describe a device mesh
    pub const fn new(handle: MeshHandle, submesh_index_counts: Vec<u32>, local_bounds: Bounds) -> Self {
        Self {
            handle,
            submesh_index_counts,
            local_bounds,
        }
    }

    /// Number of submeshes
    pub fn submesh_count(&self) -> usize {
        self.submesh_index_counts.len()
    }
}

/// What one flush did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Path actually used
    pub mode: InstancingMode,
    /// Number of points drawn
    pub instances: usize,
    /// Number of instance batches (one for the procedural path)
    pub batches: usize,
    /// Number of draw calls issued
    pub draw_calls: usize,
}

/// Result of [`PointsRenderer::flush`]
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing to draw; the device was not touched
    Skipped(DegenerateInput),
    /// Draw calls were issued
    Drawn(DrawStats),
    /// The device failed part-way; nothing more is drawn this frame
    Failed(RenderError),
}

impl FlushOutcome {
    /// Statistics, when the flush drew
    pub const fn stats(&self) -> Option<&DrawStats> {
        match self {
            Self::Drawn(stats) => Some(stats),
            _ => None,
        }
    }
}

/// Draws a mesh at every point of a point set
#[derive(Debug)]
pub struct PointsRenderer {
    config: PointsRendererConfig,
    mesh: Option<PointMesh>,
    materials: Vec<MaterialHandle>,
    buffers: BufferSet,
    batcher: InstanceBatcher,
    args_staging: Vec<IndirectArgs>,
    dirty: bool,
}

impl PointsRenderer {
    /// Create a renderer; no device resources are allocated yet
    pub fn new(config: PointsRendererConfig) -> Self {
        Self {
            config,
            mesh: None,
            materials: Vec::new(),
            buffers: BufferSet::new(),
            batcher: InstanceBatcher::new(),
            args_staging: Vec::new(),
            dirty: false,
        }
    }

    /// Mesh drawn at every point
    pub fn set_mesh(&mut self, mesh: Option<PointMesh>) {
        self.mesh = mesh;
    }

    /// Materials, one per submesh
    pub fn set_materials(&mut self, materials: Vec<MaterialHandle>) {
        self.materials = materials;
    }

    /// Request a draw path; it may still be downgraded on the next flush
    pub fn set_mode(&mut self, mode: InstancingMode) {
        self.config.instancing_mode = mode;
    }

    /// Current draw path, after any downgrade already applied
    pub const fn mode(&self) -> InstancingMode {
        self.config.instancing_mode
    }

    /// Active configuration
    pub const fn config(&self) -> &PointsRendererConfig {
        &self.config
    }

    /// GPU buffers held for the procedural path
    pub const fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    /// Whether a flush happened since the last paused redraw
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Issue this frame's draw calls
    pub fn flush(
        &mut self,
        device: &mut dyn RenderDevice,
        points: Option<&PointSet>,
        node: &Transform,
    ) -> FlushOutcome {
        let outcome = self.dispatch(device, points, node);
        if matches!(outcome, FlushOutcome::Drawn(_)) {
            self.dirty = true;
        }
        outcome
    }

    /// Re-issue the draws once while playback is paused
    ///
    /// Returns `None` when nothing was flushed since the previous redraw.
    pub fn redraw_if_dirty(
        &mut self,
        device: &mut dyn RenderDevice,
        points: Option<&PointSet>,
        node: &Transform,
    ) -> Option<FlushOutcome> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.dispatch(device, points, node))
    }

    /// Release every GPU buffer; safe to call repeatedly
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.buffers.release(device);
    }

    fn dispatch(
        &mut self,
        device: &mut dyn RenderDevice,
        points: Option<&PointSet>,
        node: &Transform,
    ) -> FlushOutcome {
        let Some(mesh) = self.mesh.as_ref() else {
            return FlushOutcome::Skipped(DegenerateInput::NoMesh);
        };
        let submeshes = mesh.submesh_count().min(self.materials.len());
        if submeshes == 0 {
            return FlushOutcome::Skipped(DegenerateInput::NoMaterials);
        }
        let Some(points) = points.filter(|points| !points.is_empty()) else {
            return FlushOutcome::Skipped(DegenerateInput::NoPoints);
        };

        let selection = select_mode(self.config.instancing_mode, device.capabilities());
        for downgrade in &selection.downgrades {
            log::warn!("PointsRenderer: {}", StreamError::from(*downgrade));
        }
        self.config.instancing_mode = selection.mode;

        let frame = Frame {
            mesh,
            materials: &self.materials[..submeshes],
            config: &self.config,
            points,
            node,
        };

        let result = match selection.mode {
            InstancingMode::Procedural => {
                draw_procedural(&frame, device, &mut self.buffers, &mut self.args_staging)
            }
            InstancingMode::Instancing => {
                self.buffers.release(device);
                draw_instanced(&frame, device, &mut self.batcher)
            }
            InstancingMode::NoInstancing => {
                self.buffers.release(device);
                draw_immediate(&frame, device)
            }
        };

        match result {
            Ok(stats) => {
                log::trace!(
                    "Drew {} points via {:?}: {} batches, {} draw calls",
                    stats.instances,
                    stats.mode,
                    stats.batches,
                    stats.draw_calls
                );
                FlushOutcome::Drawn(stats)
            }
            Err(error) => {
                log::warn!("PointsRenderer: dispatch aborted: {error}");
                FlushOutcome::Failed(error)
            }
        }
    }
}

/// Inputs shared by the three draw paths for one flush
struct Frame<'a> {
    mesh: &'a PointMesh,
    materials: &'a [MaterialHandle],
    config: &'a PointsRendererConfig,
    points: &'a PointSet,
    node: &'a Transform,
}

impl Frame<'_> {
    fn point_ids(&self) -> Option<&[u64]> {
        if self.config.use_point_ids {
            self.points.ids()
        } else {
            None
        }
    }
}

fn draw_procedural(
    frame: &Frame<'_>,
    device: &mut dyn RenderDevice,
    buffers: &mut BufferSet,
    args_staging: &mut Vec<IndirectArgs>,
) -> RenderResult<DrawStats> {
    let slots = &frame.config.slots;
    let instances = frame.points.len();
    let instance_count = u32::try_from(instances).map_err(|_| {
        RenderError::ResourceCreationFailed(format!("{instances} points exceed an indirect draw"))
    })?;

    let points_buffer = buffers.upload_points(device, frame.points.positions())?;
    let ids_buffer = match frame.point_ids() {
        Some(ids) => Some(buffers.upload_ids(device, ids)?),
        None => {
            buffers.release_ids(device);
            None
        }
    };

    args_staging.clear();
    args_staging.extend(
        frame
            .materials
            .iter()
            .zip(&frame.mesh.submesh_index_counts)
            .map(|(_, &index_count)| IndirectArgs::new(index_count, instance_count)),
    );
    buffers.upload_args(device, args_staging)?;

    let bounds = frame.points.bounds().expanded_by(&frame.mesh.local_bounds.extents);

    let mut draw_calls = 0;
    for (submesh, &material) in frame.materials.iter().enumerate() {
        device.set_material_keyword(material, &slots.procedural_keyword, true);
        device.set_material_float(material, &slots.point_size, frame.config.point_size);
        device.set_material_buffer(material, &slots.points, points_buffer);
        if let Some(ids) = ids_buffer {
            device.set_material_buffer(material, &slots.point_ids, ids);
        }

        let args = buffers.args_handle(submesh).ok_or_else(|| {
            RenderError::ResourceCreationFailed(format!("missing argument buffer for submesh {submesh}"))
        })?;
        device.draw_mesh_instanced_indirect(&DrawMeshIndirect {
            mesh: frame.mesh.handle,
            submesh,
            material,
            bounds,
            args,
            args_offset: 0,
            settings: &frame.config.draw,
        })?;
        draw_calls += 1;
    }

    Ok(DrawStats {
        mode: InstancingMode::Procedural,
        instances,
        batches: 1,
        draw_calls,
    })
}

fn draw_instanced(
    frame: &Frame<'_>,
    device: &mut dyn RenderDevice,
    batcher: &mut InstanceBatcher,
) -> RenderResult<DrawStats> {
    let slots = &frame.config.slots;
    let positions = frame.points.positions();
    let instances = positions.len();
    let batches = batch_count(instances);

    for &material in frame.materials {
        if device.is_material_keyword_enabled(material, &slots.procedural_keyword) {
            device.set_material_keyword(material, &slots.procedural_keyword, false);
        }
    }

    let ids = frame.point_ids();
    if ids.is_some() {
        batcher.reserve_property_blocks(batches);
    }

    let mut draw_calls = 0;
    for (index, range) in batch_ranges(instances).enumerate() {
        debug_assert!(range.len() <= MAX_INSTANCES_PER_DRAW);
        let batch = batcher.build_batch(
            index,
            range,
            positions,
            ids,
            frame.node,
            frame.config.point_size,
            &slots.point_ids,
        );

        for (submesh, &material) in frame.materials.iter().enumerate() {
            device.draw_mesh_instanced(&DrawMeshInstanced {
                mesh: frame.mesh.handle,
                submesh,
                material,
                matrices: batch.matrices,
                properties: batch.properties,
                settings: &frame.config.draw,
            })?;
            draw_calls += 1;
        }
    }

    Ok(DrawStats {
        mode: InstancingMode::Instancing,
        instances,
        batches,
        draw_calls,
    })
}

/// Per-point fallback; ids are never attached here
fn draw_immediate(frame: &Frame<'_>, device: &mut dyn RenderDevice) -> RenderResult<DrawStats> {
    let mut draw_calls = 0;
    for point in frame.points.positions() {
        let matrix = translation_scale(point, frame.config.point_size);
        for (submesh, &material) in frame.materials.iter().enumerate() {
            device.draw_mesh(&DrawMesh {
                mesh: frame.mesh.handle,
                submesh,
                material,
                matrix,
                settings: &frame.config.draw,
            })?;
            draw_calls += 1;
        }
    }

    Ok(DrawStats {
        mode: InstancingMode::NoInstancing,
        instances: frame.points.len(),
        batches: 0,
        draw_calls,
    })
}
