//! CPU instance batching
//!
//! Splits a point set into draw-call sized batches and builds the per-instance
//! matrices (and optional id arrays) for each one. Scratch storage is owned by the
//! batcher and grows to the largest batch seen, so steady-state frames do not
//! allocate.

use std::ops::Range;

use crate::foundation::math::{translation_scale, Mat4, Transform, Vec3};
use crate::render::api::PropertyBlock;

/// Maximum number of instances a single batched draw call may carry
pub const MAX_INSTANCES_PER_DRAW: usize = 1023;

/// Number of batches needed for `instance_count` instances
pub const fn batch_count(instance_count: usize) -> usize {
    instance_count.div_ceil(MAX_INSTANCES_PER_DRAW)
}

/// Index ranges of every batch, in order, covering `0..instance_count`
pub fn batch_ranges(instance_count: usize) -> impl Iterator<Item = Range<usize>> {
    (0..batch_count(instance_count)).map(move |batch| {
        let begin = batch * MAX_INSTANCES_PER_DRAW;
        let end = (begin + MAX_INSTANCES_PER_DRAW).min(instance_count);
        begin..end
    })
}

/// Instance data for one batched draw, borrowed from the batcher's scratch space
#[derive(Debug)]
pub struct Batch<'a> {
    /// Position of the batch in the frame
    pub index: usize,
    /// Slice of the point set this batch covers
    pub range: Range<usize>,
    /// One matrix per instance in `range`
    pub matrices: &'a [Mat4],
    /// Per-batch overrides carrying the float-encoded ids, when ids are in use
    pub properties: Option<&'a PropertyBlock>,
}

impl Batch<'_> {
    /// Number of instances in this batch
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Builds instance batches for the CPU instancing path
#[derive(Debug, Default)]
pub struct InstanceBatcher {
    matrices: Vec<Mat4>,
    ids: Vec<f32>,
    property_blocks: Vec<PropertyBlock>,
}

impl InstanceBatcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure there is one property block per batch this frame
    ///
    /// Blocks are pooled across frames; the pool only grows.
    pub fn reserve_property_blocks(&mut self, batches: usize) {
        while self.property_blocks.len() < batches {
            self.property_blocks.push(PropertyBlock::new());
        }
    }

    /// Build the matrices (and ids, when given) for the batch at `index`
    ///
    /// Each point is rotated by the owning node, offset by its position and scaled
    /// uniformly by `point_size`; the instances themselves carry no rotation.
    ///
    /// `ids`, when present, must be parallel to `positions`; they are written into
    /// the batch's own property block under `ids_slot`.
    pub fn build_batch(
        &mut self,
        index: usize,
        range: Range<usize>,
        positions: &[Vec3],
        ids: Option<&[u64]>,
        node: &Transform,
        point_size: f32,
        ids_slot: &str,
    ) -> Batch<'_> {
        let count = range.len();
        if self.matrices.len() < count {
            self.matrices.resize(count, Mat4::identity());
        }

        for (matrix, point) in self.matrices.iter_mut().zip(&positions[range.clone()]) {
            *matrix = translation_scale(&node.transform_point(point), point_size);
        }

        let properties = match ids {
            Some(ids) => {
                self.ids.clear();
                // Shader inputs are float; ids above 2^24 lose precision
                self.ids.extend(ids[range.clone()].iter().map(|&id| id as f32));

                self.reserve_property_blocks(index + 1);
                let block = &mut self.property_blocks[index];
                block.set_float_array(ids_slot, &self.ids);
                Some(&self.property_blocks[index])
            }
            None => None,
        };

        Batch {
            index,
            range,
            matrices: &self.matrices[..count],
            properties,
        }
    }

    /// Capacity of the matrix scratch buffer
    pub fn matrix_capacity(&self) -> usize {
        self.matrices.len()
    }

    /// Number of pooled property blocks
    pub fn property_block_count(&self) -> usize {
        self.property_blocks.len()
    }
}
