//! Source collaborator
//!
//! A [`StreamSource`] opens time-sampled geometry and hands back a
//! [`StreamHandle`] that owns the connection and the scene nodes bound to it.
//! The player drives the handle through one begin/end cycle per frame:
//!
//! ```text
//! open ──► request_sample(t) ──► finalize_sample() ──► ... ──► close
//!              │
//!              └─ Rejected: the source behind the handle went away
//! ```
//!
//! [`memory::MemorySource`] is a reference implementation backed by keyframed
//! point sets.

pub mod memory;

use std::path::{Path, PathBuf};

use crate::core::PlayerConfig;

pub use memory::{Clip, MemoryHandle, MemorySource, PointCloudNode};

/// Everything a source needs to open a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Location of the source data
    pub path: PathBuf,
    /// `(start, end)` of the source in seconds, once known
    pub media_range: Option<(f64, f64)>,
    /// Per-stream settings
    pub settings: PlayerConfig,
}

impl StreamDescriptor {
    /// Describe a stream at `path` with default settings
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            media_range: None,
            settings: PlayerConfig::default(),
        }
    }

    /// Set the per-stream settings
    pub const fn with_settings(mut self, settings: PlayerConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Path as a `Path`
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Answer to [`StreamHandle::request_sample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRequest {
    /// The sample was started and must be finalized
    Accepted,
    /// The handle can no longer serve samples
    Rejected,
}

/// Live connection to an opened source
pub trait StreamHandle {
    /// `(start, end)` of the source in seconds
    fn time_range(&self) -> (f64, f64);

    /// Multiplier applied to motion vectors of subsequent samples
    fn set_vertex_motion_scale(&mut self, scale: f32);

    /// Begin sampling at absolute source time `time`
    ///
    /// With `async_hint` the source may decode in the background until
    /// [`finalize_sample`](Self::finalize_sample); without it decoding completes
    /// before this call returns.
    fn request_sample(&mut self, time: f64, async_hint: bool) -> SampleRequest;

    /// Wait for the outstanding sample, if any, and apply it to the bound nodes
    fn finalize_sample(&mut self);

    /// Release the connection; further requests are rejected
    fn close(&mut self);
}

/// Opens stream handles
pub trait StreamSource {
    /// Handle type produced by [`open`](Self::open)
    type Handle: StreamHandle;

    /// Open the source described by `descriptor`
    ///
    /// With `create_missing_nodes` the source creates scene nodes for data it has
    /// no node for; otherwise it only binds nodes that already exist.
    fn open(&mut self, descriptor: &StreamDescriptor, create_missing_nodes: bool) -> SourceResult<Self::Handle>;
}

/// Source collaborator failures
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Nothing exists at the given path
    #[error("Source not found: {0}")]
    NotFound(PathBuf),

    /// The data behind the path was replaced or removed
    #[error("Source invalidated: {0}")]
    Invalidated(PathBuf),

    /// Reading the source failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoder-specific failure
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;
