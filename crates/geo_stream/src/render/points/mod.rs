//! Instanced point rendering
//!
//! - [`point_set`]: the per-sample point data
//! - [`strategy`]: capability-driven draw path selection
//! - [`batcher`]: CPU instance batches for the instancing path
//! - [`buffer_set`]: GPU buffers for the procedural path
//! - [`renderer`]: per-frame dispatch tying the above together

pub mod batcher;
pub mod buffer_set;
pub mod point_set;
pub mod renderer;
pub mod strategy;

pub use batcher::{batch_count, batch_ranges, Batch, InstanceBatcher, MAX_INSTANCES_PER_DRAW};
pub use buffer_set::{BufferSet, GpuBuffer, IndirectArgs};
pub use point_set::PointSet;
pub use renderer::{DrawStats, FlushOutcome, PointMesh, PointsRenderer};
pub use strategy::{select_mode, Downgrade, InstancingMode, ModeSelection};
