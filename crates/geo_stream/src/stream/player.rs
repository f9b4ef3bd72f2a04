//! Stream player
//!
//! Owns a source, the handle opened from it, the playback window and the
//! two-phase sample cycle. The host drives it once per frame:
//!
//! ```rust,no_run
//! # use geo_stream::prelude::*;
//! # fn frame(player: &mut StreamPlayer<MemorySource, SimpleScene>, dt: f64) {
//! player.set_current_time(player.current_time() + dt);
//! player.update();
//! // ... anything else that may move the playback time ...
//! player.late_update();
//! # }
//! ```

use std::path::{Path, PathBuf};

use crate::core::PlayerConfig;
use crate::error::{StreamError, StreamResult};
use crate::scene::SceneGraph;
use crate::source::{StreamDescriptor, StreamHandle, StreamSource};

use super::cycle::{CyclePhase, UpdateCycle, UpdateStep};
use super::window::StreamWindow;

/// Open `descriptor` without creating nodes, logging failures
fn reopen<S: StreamSource>(source: &mut S, descriptor: &StreamDescriptor) -> Option<S::Handle> {
    match source.open(descriptor, false) {
        Ok(handle) => {
            log::debug!("Reopened {}", descriptor.path.display());
            Some(handle)
        }
        Err(error) => {
            log::warn!("{}", unavailable(descriptor.path(), &error));
            None
        }
    }
}

fn unavailable(path: &Path, error: &dyn std::fmt::Display) -> StreamError {
    StreamError::SourceUnavailable {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

/// Streams a source into a scene over a time window
pub struct StreamPlayer<S: StreamSource, G: SceneGraph> {
    source: S,
    scene: G,
    descriptor: Option<StreamDescriptor>,
    settings: PlayerConfig,
    window: StreamWindow,
    cycle: UpdateCycle<S::Handle>,
    materials_assigned: bool,
}

impl<S: StreamSource, G: SceneGraph> StreamPlayer<S, G> {
    /// Create an unbound player
    pub fn new(source: S, scene: G, settings: PlayerConfig) -> Self {
        Self {
            source,
            scene,
            descriptor: None,
            settings,
            window: StreamWindow::new(),
            cycle: UpdateCycle::new(),
            materials_assigned: false,
        }
    }

    /// Remember a stream to open on [`on_enable`](Self::on_enable) without
    /// loading it now
    pub fn with_descriptor(mut self, descriptor: StreamDescriptor) -> Self {
        if let Some((start, end)) = descriptor.media_range {
            self.window.bind_media_range(start, end);
            self.window.reset_to_media_range();
        }
        self.descriptor = Some(descriptor);
        self
    }

    /// Load a new source, replacing the current one
    ///
    /// Returns `false` and leaves the player unbound if the source cannot be
    /// opened; the reason is logged. The previous path and window are kept.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> bool {
        match self.try_load(path) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("{error}");
                false
            }
        }
    }

    /// Load a new source, replacing the current one
    ///
    /// On success the window spans the whole media range and the next update
    /// samples. The first successful load also assigns the scene's default
    /// material to every renderer and keeps stream meshes out of saved scenes.
    pub fn try_load(&mut self, path: impl Into<PathBuf>) -> StreamResult<()> {
        let mut descriptor = StreamDescriptor::new(path).with_settings(self.settings);
        self.cycle.teardown();

        let handle = self
            .source
            .open(&descriptor, true)
            .map_err(|error| unavailable(descriptor.path(), &error))?;

        let (start, end) = handle.time_range();
        self.cycle.bind(Some(handle));
        self.window.bind_media_range(start, end);
        self.window.reset_to_media_range();
        descriptor.media_range = self.window.media_range();
        log::info!("Loaded {} [{start}, {end}]", descriptor.path.display());
        self.descriptor = Some(descriptor);

        if !self.materials_assigned {
            self.assign_default_materials();
            self.materials_assigned = true;
        }
        Ok(())
    }

    /// Open the remembered stream if unbound, then re-validate the window
    pub fn on_enable(&mut self) {
        if !self.cycle.is_bound() {
            if let Some(descriptor) = &self.descriptor {
                let handle = reopen(&mut self.source, descriptor);
                self.cycle.bind(handle);
            }
        }
        self.validate();
    }

    /// Close the handle
    pub fn on_disable(&mut self) {
        self.cycle.teardown();
    }

    /// Phase 1 of the frame: begin a sample if the time changed
    pub fn update(&mut self) -> UpdateStep {
        let Some(descriptor) = &self.descriptor else {
            return UpdateStep::Unbound;
        };
        let time = self.window.absolute_sample_time();
        let source = &mut self.source;
        let step = self.cycle.update(time, &self.settings, || reopen(source, descriptor));
        self.rebind_if_reopened();
        step
    }

    /// Phase 2 of the frame: apply the begun sample
    ///
    /// Returns whether a sample was applied to the scene.
    pub fn late_update(&mut self) -> bool {
        let Some(descriptor) = &self.descriptor else {
            return false;
        };
        let time = self.window.absolute_sample_time();
        let source = &mut self.source;
        let finalized = self.cycle.late_update(time, &self.settings, || reopen(source, descriptor));
        self.rebind_if_reopened();
        finalized
    }

    /// Sample `current` (relative to the window start) and apply it before
    /// returning
    pub fn force_sync(&mut self, current: f64) -> bool {
        if self.descriptor.is_none() {
            return false;
        }
        if self.cycle.phase() == CyclePhase::UpdateReady {
            self.late_update();
        }

        self.window.set_current(current);
        let settings = self.settings.with_async_load(false);
        let Some(descriptor) = &self.descriptor else {
            return false;
        };
        let source = &mut self.source;
        let time = self.window.absolute_sample_time();
        self.cycle.update(time, &settings, || reopen(source, descriptor));
        let finalized = self.cycle.late_update(time, &settings, || reopen(source, descriptor));
        self.rebind_if_reopened();
        finalized
    }

    /// Set playback from an absolute source time
    pub fn set_absolute_time(&mut self, time: f64) {
        self.window.set_absolute_time(time);
    }

    /// Set playback time relative to the window start
    pub fn set_current_time(&mut self, current: f64) {
        self.window.set_current(current);
    }

    /// Move the window start
    pub fn set_start_time(&mut self, start: f64) {
        self.window.set_start(start);
    }

    /// Move the window end
    pub fn set_end_time(&mut self, end: f64) {
        self.window.set_end(end);
    }

    /// Playback time relative to the window start
    pub const fn current_time(&self) -> f64 {
        self.window.current()
    }

    /// Window start
    pub const fn start_time(&self) -> f64 {
        self.window.start()
    }

    /// Window end
    pub const fn end_time(&self) -> f64 {
        self.window.end()
    }

    /// Window length
    pub fn duration(&self) -> f64 {
        self.window.duration()
    }

    /// Start of the source, or zero before anything was opened
    pub fn media_start_time(&self) -> f64 {
        self.window.media_start()
    }

    /// End of the source, or zero before anything was opened
    pub fn media_end_time(&self) -> f64 {
        self.window.media_end()
    }

    /// Length of the source
    pub fn media_duration(&self) -> f64 {
        self.window.media_duration()
    }

    /// Path of the current stream
    pub fn path(&self) -> Option<&Path> {
        self.descriptor.as_ref().map(StreamDescriptor::path)
    }

    /// Playback window
    pub const fn window(&self) -> &StreamWindow {
        &self.window
    }

    /// Per-stream settings
    pub const fn settings(&self) -> &PlayerConfig {
        &self.settings
    }

    /// Replace the per-stream settings; the next update samples again
    pub fn set_settings(&mut self, settings: PlayerConfig) {
        self.settings = settings;
        if let Some(descriptor) = &mut self.descriptor {
            descriptor.settings = settings;
        }
        self.cycle.force_refresh();
    }

    /// Whether a handle is bound
    pub const fn is_bound(&self) -> bool {
        self.cycle.is_bound()
    }

    /// Current cycle phase
    pub const fn phase(&self) -> CyclePhase {
        self.cycle.phase()
    }

    /// Bound handle
    pub const fn handle(&self) -> Option<&S::Handle> {
        self.cycle.handle()
    }

    /// The source
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The source, mutably
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The scene
    pub const fn scene(&self) -> &G {
        &self.scene
    }

    /// The scene, mutably
    pub fn scene_mut(&mut self) -> &mut G {
        &mut self.scene
    }

    /// Re-read the media range of the bound handle, clamp the window, force a
    /// refresh
    fn validate(&mut self) {
        if self.cycle.is_bound() {
            self.rebind_media_range();
            self.cycle.force_refresh();
        }
    }

    /// Pick up the time range of a handle the cycle reopened by itself
    fn rebind_if_reopened(&mut self) {
        if self.cycle.take_reopened() {
            self.rebind_media_range();
        }
    }

    /// Bind the handle's time range, keeping the relative window where it fits
    ///
    /// A window that never had a media range spans the whole of it.
    fn rebind_media_range(&mut self) {
        let Some(handle) = self.cycle.handle() else {
            return;
        };
        let (start, end) = handle.time_range();
        let first_range = self.window.media_range().is_none();
        if !self.window.bind_media_range(start, end) {
            return;
        }
        if first_range {
            self.window.reset_to_media_range();
        }
        if let Some(descriptor) = &mut self.descriptor {
            if descriptor.media_range != self.window.media_range() {
                log::debug!("Media range of {} is now [{start}, {end}]", descriptor.path.display());
            }
            descriptor.media_range = self.window.media_range();
        }
    }

    fn assign_default_materials(&mut self) {
        match self.scene.default_material() {
            Some(material) => {
                for node in self.scene.renderable_nodes() {
                    let slots = self.scene.material_slot_count(node);
                    self.scene.set_materials(node, vec![material; slots]);
                }
            }
            None => log::warn!("Scene has no default material; keeping imported materials"),
        }
        for node in self.scene.mesh_nodes() {
            self.scene.exclude_mesh_from_save(node);
        }
    }
}

impl<S: StreamSource, G: SceneGraph> Drop for StreamPlayer<S, G> {
    fn drop(&mut self) {
        self.cycle.teardown();
    }
}
