//! In-memory stream source
//!
//! Serves keyframed [`PointSet`]s registered under a path. Sampling picks the
//! nearest keyframe for the requested time, clamped to the clip. With the async
//! hint the keyframe is only copied out at finalize; without it the copy happens
//! inside `request_sample`.
//!
//! A clip can be invalidated to emulate the file behind a stream being replaced
//! or deleted: open fails and live handles reject further requests until the clip
//! is restored.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::render::points::PointSet;

use super::{SampleRequest, SourceError, SourceResult, StreamDescriptor, StreamHandle, StreamSource};

/// Scene node the sampled points are written to
///
/// Cloning shares the node; the renderer reads what the stream last applied.
#[derive(Debug, Clone, Default)]
pub struct PointCloudNode {
    points: Rc<RefCell<Option<PointSet>>>,
}

impl PointCloudNode {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }

    /// Points applied by the last finalized sample
    pub fn points(&self) -> Ref<'_, Option<PointSet>> {
        self.points.borrow()
    }

    /// Replace the node's points
    pub fn set_points(&self, points: PointSet) {
        *self.points.borrow_mut() = Some(points);
    }
}

/// Uniformly sampled keyframes
#[derive(Debug)]
pub struct Clip {
    start_time: f64,
    frame_interval: f64,
    frames: Vec<PointSet>,
    invalidated: Cell<bool>,
}

impl Clip {
    /// Keyframes starting at `start_time`, `frame_interval` seconds apart
    pub fn new(start_time: f64, frame_interval: f64, frames: Vec<PointSet>) -> Self {
        Self {
            start_time,
            frame_interval,
            frames,
            invalidated: Cell::new(false),
        }
    }

    /// `(start, end)` covered by the keyframes
    pub fn time_range(&self) -> (f64, f64) {
        let spans = self.frames.len().saturating_sub(1) as f64;
        (self.start_time, self.start_time + self.frame_interval.max(0.0) * spans)
    }

    /// Index of the keyframe nearest to `time`
    pub fn frame_index(&self, time: f64) -> usize {
        let last = self.frames.len().saturating_sub(1);
        if last == 0 || self.frame_interval <= 0.0 || !time.is_finite() {
            return 0;
        }
        let position = ((time - self.start_time) / self.frame_interval).round();
        if position <= 0.0 {
            0
        } else {
            // Clamped before the cast, so the value fits
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = position.min(last as f64) as usize;
            index
        }
    }

    /// Number of keyframes
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the clip has no keyframes
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn frame(&self, index: usize) -> Option<&PointSet> {
        self.frames.get(index)
    }
}

/// Source serving registered [`Clip`]s
#[derive(Debug, Default)]
pub struct MemorySource {
    clips: HashMap<PathBuf, Rc<Clip>>,
    node: Option<PointCloudNode>,
}

impl MemorySource {
    /// Create a source with no clips and no scene node
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `clip` under `path`, replacing any previous clip
    pub fn insert_clip(&mut self, path: impl Into<PathBuf>, clip: Clip) {
        self.clips.insert(path.into(), Rc::new(clip));
    }

    /// Mark the clip at `path` as replaced on disk; returns whether it exists
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        self.set_invalidated(path.as_ref(), true)
    }

    /// Make an invalidated clip available again; returns whether it exists
    pub fn restore(&self, path: impl AsRef<Path>) -> bool {
        self.set_invalidated(path.as_ref(), false)
    }

    /// Scene node created by the first open with `create_missing_nodes`
    pub const fn node(&self) -> Option<&PointCloudNode> {
        self.node.as_ref()
    }

    fn set_invalidated(&self, path: &Path, invalidated: bool) -> bool {
        let Some(clip) = self.clips.get(path) else {
            return false;
        };
        clip.invalidated.set(invalidated);
        true
    }
}

impl StreamSource for MemorySource {
    type Handle = MemoryHandle;

    fn open(&mut self, descriptor: &StreamDescriptor, create_missing_nodes: bool) -> SourceResult<MemoryHandle> {
        let clip = self
            .clips
            .get(descriptor.path())
            .ok_or_else(|| SourceError::NotFound(descriptor.path.clone()))?;
        if clip.invalidated.get() {
            return Err(SourceError::Invalidated(descriptor.path.clone()));
        }
        if clip.is_empty() {
            return Err(SourceError::Decode(format!(
                "{} has no keyframes",
                descriptor.path.display()
            )));
        }

        if self.node.is_none() && create_missing_nodes {
            log::debug!("Creating point cloud node for {}", descriptor.path.display());
            self.node = Some(PointCloudNode::new());
        }

        Ok(MemoryHandle {
            clip: Rc::clone(clip),
            node: self.node.clone(),
            pending: None,
            vertex_motion_scale: descriptor.settings.vertex_motion_scale,
            closed: false,
        })
    }
}

/// A requested sample waiting for finalize
#[derive(Debug)]
enum Pending {
    /// Decoded inside `request_sample`
    Decoded(PointSet),
    /// Decoded at finalize
    Deferred(usize),
}

/// Handle onto a [`Clip`]
#[derive(Debug)]
pub struct MemoryHandle {
    clip: Rc<Clip>,
    node: Option<PointCloudNode>,
    pending: Option<Pending>,
    vertex_motion_scale: f32,
    closed: bool,
}

impl MemoryHandle {
    /// Last motion scale pushed by the player
    pub const fn vertex_motion_scale(&self) -> f32 {
        self.vertex_motion_scale
    }

    /// Whether a sample is waiting for finalize
    pub const fn has_pending_sample(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether [`close`](StreamHandle::close) was called
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StreamHandle for MemoryHandle {
    fn time_range(&self) -> (f64, f64) {
        self.clip.time_range()
    }

    fn set_vertex_motion_scale(&mut self, scale: f32) {
        self.vertex_motion_scale = scale;
    }

    fn request_sample(&mut self, time: f64, async_hint: bool) -> SampleRequest {
        if self.closed || self.clip.invalidated.get() {
            return SampleRequest::Rejected;
        }

        let index = self.clip.frame_index(time);
        self.pending = if async_hint {
            Some(Pending::Deferred(index))
        } else {
            match self.clip.frame(index) {
                Some(frame) => Some(Pending::Decoded(frame.clone())),
                None => return SampleRequest::Rejected,
            }
        };
        SampleRequest::Accepted
    }

    fn finalize_sample(&mut self) {
        let points = match self.pending.take() {
            Some(Pending::Decoded(points)) => points,
            Some(Pending::Deferred(index)) => match self.clip.frame(index) {
                Some(frame) => frame.clone(),
                None => return,
            },
            None => return,
        };

        match &self.node {
            Some(node) => node.set_points(points),
            None => log::trace!("Sample finalized with no bound node"),
        }
    }

    fn close(&mut self) {
        self.pending = None;
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn clip(frames: usize) -> Clip {
        let frames = (0..frames)
            .map(|i| PointSet::new(vec![Vec3::new(i as f32, 0.0, 0.0); i + 1]))
            .collect();
        Clip::new(1.0, 0.5, frames)
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert_clip("cloud.abc", clip(5));
        source
    }

    #[test]
    fn test_time_range_and_frame_index() {
        let clip = clip(5);

        assert_eq!(clip.time_range(), (1.0, 3.0));
        assert_eq!(clip.frame_index(-10.0), 0);
        assert_eq!(clip.frame_index(1.0), 0);
        assert_eq!(clip.frame_index(1.3), 1);
        assert_eq!(clip.frame_index(2.0), 2);
        assert_eq!(clip.frame_index(99.0), 4);
        assert_eq!(clip.frame_index(f64::NAN), 0);
    }

    #[test]
    fn test_open_missing_path_fails() {
        let mut source = source();
        let result = source.open(&StreamDescriptor::new("other.abc"), true);
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_node_created_only_when_allowed() {
        let mut source = source();
        let descriptor = StreamDescriptor::new("cloud.abc");

        source.open(&descriptor, false).unwrap();
        assert!(source.node().is_none());

        source.open(&descriptor, true).unwrap();
        assert!(source.node().is_some());
    }

    #[test]
    fn test_sync_sample_applied_at_finalize() {
        let mut source = source();
        let mut handle = source.open(&StreamDescriptor::new("cloud.abc"), true).unwrap();
        let node = source.node().cloned().unwrap();

        assert_eq!(handle.request_sample(2.0, false), SampleRequest::Accepted);
        assert!(node.points().is_none());

        handle.finalize_sample();
        assert_eq!(node.points().as_ref().map(PointSet::len), Some(3));
        assert!(!handle.has_pending_sample());
    }

    #[test]
    fn test_async_sample_decoded_at_finalize() {
        let mut source = source();
        let mut handle = source.open(&StreamDescriptor::new("cloud.abc"), true).unwrap();
        let node = source.node().cloned().unwrap();

        handle.request_sample(3.0, true);
        assert!(handle.has_pending_sample());
        handle.finalize_sample();

        assert_eq!(node.points().as_ref().map(PointSet::len), Some(5));
    }

    #[test]
    fn test_invalidated_clip_rejects_until_restored() {
        let mut source = source();
        let descriptor = StreamDescriptor::new("cloud.abc");
        let mut handle = source.open(&descriptor, true).unwrap();

        assert!(source.invalidate("cloud.abc"));
        assert_eq!(handle.request_sample(1.0, true), SampleRequest::Rejected);
        assert!(matches!(source.open(&descriptor, false), Err(SourceError::Invalidated(_))));

        assert!(source.restore("cloud.abc"));
        assert!(source.open(&descriptor, false).is_ok());
        assert!(!source.invalidate("missing.abc"));
    }

    #[test]
    fn test_closed_handle_rejects() {
        let mut source = source();
        let mut handle = source.open(&StreamDescriptor::new("cloud.abc"), true).unwrap();
        handle.request_sample(1.0, true);

        handle.close();

        assert!(handle.is_closed());
        assert!(!handle.has_pending_sample());
        assert_eq!(handle.request_sample(1.0, true), SampleRequest::Rejected);
    }
}
