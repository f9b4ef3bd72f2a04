//! # Geo Stream
//!
//! Time-windowed streaming of sampled geometry and instanced rendering of the
//! point sets it produces.
//!
//! ## Features
//!
//! - **Stream Player**: start/end/current window, two-phase begin/end sampling,
//!   automatic reopen when the source behind a stream goes away
//! - **Point Renderer**: indirect, batched-instanced or per-point draws picked from
//!   the device capabilities, with GPU buffers reused across frames
//! - **Collaborator Traits**: [`source::StreamSource`], [`scene::SceneGraph`] and
//!   [`render::RenderDevice`] keep decoding, scene and GPU details outside
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geo_stream::prelude::*;
//!
//! fn run(device: &mut dyn RenderDevice, source: MemorySource) {
//!     let mut player = StreamPlayer::new(source, SimpleScene::new(), PlayerConfig::default());
//!     if !player.load("cloud.abc") {
//!         return;
//!     }
//!
//!     let mut renderer = PointsRenderer::new(PointsRendererConfig::default());
//!     renderer.set_mesh(Some(PointMesh::new(MeshHandle(1), vec![36], Bounds::default())));
//!     renderer.set_materials(vec![MaterialHandle(1)]);
//!
//!     for frame in 0..100 {
//!         player.set_current_time(f64::from(frame) / 30.0);
//!         player.update();
//!         player.late_update();
//!
//!         let node = player.source().node().cloned().unwrap_or_default();
//!         let points = node.points();
//!         renderer.flush(device, points.as_ref(), &Transform::identity());
//!     }
//!
//!     renderer.release(device);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod error;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod source;
pub mod stream;

#[cfg(test)]
mod testing;

pub use error::{DegenerateInput, StreamError, StreamResult};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        core::{Config, PlayerConfig, PointsRendererConfig, StreamConfig},
        error::{StreamError, StreamResult},
        foundation::math::{Bounds, Mat4, Transform, Vec3},
        render::api::{DrawSettings, MaterialHandle, MeshHandle, RenderCapabilities, RenderDevice},
        render::points::{DrawStats, FlushOutcome, InstancingMode, PointMesh, PointSet, PointsRenderer},
        scene::{SceneGraph, SimpleScene},
        source::{MemorySource, PointCloudNode, StreamDescriptor, StreamHandle, StreamSource},
        stream::{StreamPlayer, StreamWindow, UpdateStep},
    };
}
