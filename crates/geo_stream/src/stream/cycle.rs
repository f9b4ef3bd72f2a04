//! Two-phase sample cycle
//!
//! Each frame the host calls [`UpdateCycle::update`] early and
//! [`UpdateCycle::late_update`] after everything that may move the playback time
//! has run. A sample begins in the first phase and is applied to the scene in the
//! second, so the source can decode in between.
//!
//! ```text
//!            update: time changed or refresh forced
//!   Idle ──────────────────────────────────────────► UpdatePending
//!    ▲                                                    │ accepted
//!    │          late_update: finalize                     ▼
//!    └──────────────────────────────────────────────── UpdateReady
//! ```
//!
//! A rejected request closes the handle and reopens the source once without
//! creating nodes. Nothing here is fatal: without a handle the cycle idles and
//! only tries to reopen when the requested time changes.

use crate::core::PlayerConfig;
use crate::error::StreamError;
use crate::source::{SampleRequest, StreamHandle};

/// Where the cycle is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    /// No sample outstanding
    #[default]
    Idle,
    /// A sample request is being issued
    UpdatePending,
    /// A sample was begun and waits for `late_update`
    UpdateReady,
}

/// What [`UpdateCycle::update`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    /// No handle, and the time did not change since the last open attempt
    Unbound,
    /// No handle; an open was attempted. Carries whether it succeeded
    Reopened(bool),
    /// Time unchanged and no refresh forced
    Unchanged,
    /// A begun sample still waits for `late_update`
    Waiting,
    /// A sample was begun
    Begun,
    /// The source rejected the request; carries whether the reopen succeeded
    Rejected(bool),
}

/// Begin/end sample state machine owning the stream handle
#[derive(Debug)]
pub struct UpdateCycle<H: StreamHandle> {
    handle: Option<H>,
    phase: CyclePhase,
    last_consumed: Option<f64>,
    last_attempted: Option<f64>,
    force_refresh: bool,
    reopened: bool,
}

impl<H: StreamHandle> Default for UpdateCycle<H> {
    fn default() -> Self {
        Self {
            handle: None,
            phase: CyclePhase::Idle,
            last_consumed: None,
            last_attempted: None,
            force_refresh: false,
            reopened: false,
        }
    }
}

impl<H: StreamHandle> UpdateCycle<H> {
    /// Unbound, idle cycle
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the handle, closing the previous one
    ///
    /// Binding a handle forces the next update to sample even if the time did not
    /// change.
    pub fn bind(&mut self, handle: Option<H>) {
        self.teardown();
        if handle.is_some() {
            self.force_refresh = true;
        }
        self.handle = handle;
    }

    /// Current handle
    pub const fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    /// Current handle, mutably
    pub fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    /// Whether a handle is bound
    pub const fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Current phase
    pub const fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Absolute time of the last begun (or rejected) sample
    pub const fn last_consumed_time(&self) -> Option<f64> {
        self.last_consumed
    }

    /// Whether the next update samples regardless of the time
    pub const fn is_refresh_forced(&self) -> bool {
        self.force_refresh
    }

    /// Whether `reopen` bound a new handle since the last call; clears the flag
    ///
    /// The new handle may cover a different time range than the one it replaced.
    pub fn take_reopened(&mut self) -> bool {
        std::mem::take(&mut self.reopened)
    }

    /// Sample on the next update even if the time is unchanged
    pub fn force_refresh(&mut self) {
        self.force_refresh = true;
    }

    /// Phase 1: begin a sample at `time` if needed
    ///
    /// `reopen` is called to get a new handle, without creating nodes, when the
    /// cycle is unbound or the source rejected a request.
    pub fn update(
        &mut self,
        time: f64,
        settings: &PlayerConfig,
        mut reopen: impl FnMut() -> Option<H>,
    ) -> UpdateStep {
        if self.phase == CyclePhase::UpdateReady {
            return UpdateStep::Waiting;
        }

        let Some(handle) = self.handle.as_mut() else {
            if self.last_attempted == Some(time) {
                return UpdateStep::Unbound;
            }
            self.last_attempted = Some(time);
            let handle = reopen();
            let bound = handle.is_some();
            self.bind(handle);
            self.reopened |= bound;
            return UpdateStep::Reopened(bound);
        };

        if !self.force_refresh && self.last_consumed == Some(time) {
            return UpdateStep::Unchanged;
        }

        handle.set_vertex_motion_scale(settings.vertex_motion_scale);
        self.phase = CyclePhase::UpdatePending;
        let request = handle.request_sample(time, settings.async_load);
        self.last_consumed = Some(time);
        self.force_refresh = false;

        match request {
            SampleRequest::Accepted => {
                self.phase = CyclePhase::UpdateReady;
                UpdateStep::Begun
            }
            SampleRequest::Rejected => {
                log::warn!("{}; reopening source", StreamError::SampleRejected { time });
                self.teardown();
                self.last_attempted = Some(time);
                self.handle = reopen();
                self.reopened |= self.handle.is_some();
                UpdateStep::Rejected(self.handle.is_some())
            }
        }
    }

    /// Phase 2: catch up with a late time change, then apply the begun sample
    ///
    /// Returns whether a sample was finalized.
    pub fn late_update(
        &mut self,
        time: f64,
        settings: &PlayerConfig,
        reopen: impl FnMut() -> Option<H>,
    ) -> bool {
        if self.phase != CyclePhase::UpdateReady && self.last_consumed != Some(time) {
            self.update(time, settings, reopen);
        }

        if self.phase != CyclePhase::UpdateReady {
            return false;
        }
        self.phase = CyclePhase::Idle;
        match self.handle.as_mut() {
            Some(handle) => {
                handle.finalize_sample();
                true
            }
            None => false,
        }
    }

    /// Close the handle and return to idle; safe to call repeatedly
    pub fn teardown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.phase = CyclePhase::Idle;
        self.reopened = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{StreamDescriptor, StreamSource};
    use crate::testing::{ScriptedHandle, ScriptedSource};

    fn bound_cycle() -> (ScriptedSource, UpdateCycle<ScriptedHandle>) {
        let mut source = ScriptedSource::new((0.0, 10.0));
        let mut cycle = UpdateCycle::new();
        cycle.bind(source.open(&StreamDescriptor::new("a.abc"), true).ok());
        (source, cycle)
    }

    fn reopen(source: &mut ScriptedSource) -> impl FnMut() -> Option<ScriptedHandle> + '_ {
        move || source.open(&StreamDescriptor::new("a.abc"), false).ok()
    }

    #[test]
    fn test_begins_only_on_change_or_force() {
        let (mut source, mut cycle) = bound_cycle();
        let script = source.script();
        let settings = PlayerConfig::default();

        assert_eq!(cycle.update(1.0, &settings, reopen(&mut source)), UpdateStep::Begun);
        assert!(cycle.late_update(1.0, &settings, reopen(&mut source)));

        assert_eq!(cycle.update(1.0, &settings, reopen(&mut source)), UpdateStep::Unchanged);
        assert!(!cycle.late_update(1.0, &settings, reopen(&mut source)));

        cycle.force_refresh();
        assert_eq!(cycle.update(1.0, &settings, reopen(&mut source)), UpdateStep::Begun);
        cycle.late_update(1.0, &settings, reopen(&mut source));

        assert_eq!(cycle.update(2.0, &settings, reopen(&mut source)), UpdateStep::Begun);

        let script = script.borrow();
        assert_eq!(script.requests, vec![(1.0, true), (1.0, true), (2.0, true)]);
        assert_eq!(script.motion_scales.len(), 3);
    }

    #[test]
    fn test_no_second_begin_while_ready() {
        let (mut source, mut cycle) = bound_cycle();
        let settings = PlayerConfig::default();

        cycle.update(1.0, &settings, reopen(&mut source));
        assert_eq!(cycle.phase(), CyclePhase::UpdateReady);
        assert_eq!(cycle.update(2.0, &settings, reopen(&mut source)), UpdateStep::Waiting);
        assert_eq!(source.script().borrow().requests.len(), 1);

        assert!(cycle.late_update(2.0, &settings, reopen(&mut source)));
        assert_eq!(cycle.phase(), CyclePhase::Idle);
        assert_eq!(source.script().borrow().finalized, 1);
    }

    #[test]
    fn test_late_update_catches_up_with_moved_time() {
        let (mut source, mut cycle) = bound_cycle();
        let settings = PlayerConfig::default();

        cycle.update(1.0, &settings, reopen(&mut source));
        cycle.late_update(1.0, &settings, reopen(&mut source));

        // Time unchanged at update, moved by another system before late update
        assert_eq!(cycle.update(1.0, &settings, reopen(&mut source)), UpdateStep::Unchanged);
        assert!(cycle.late_update(3.0, &settings, reopen(&mut source)));

        assert_eq!(source.script().borrow().requests.last(), Some(&(3.0, true)));
        assert_eq!(cycle.last_consumed_time(), Some(3.0));
    }

    #[test]
    fn test_rejection_reopens_once_without_creating_nodes() {
        let (mut source, mut cycle) = bound_cycle();
        let script = source.script();
        let settings = PlayerConfig::default();
        script.borrow_mut().reject_requests = 1;

        assert_eq!(cycle.update(4.0, &settings, reopen(&mut source)), UpdateStep::Rejected(true));
        assert!(!cycle.late_update(4.0, &settings, reopen(&mut source)));

        {
            let script = script.borrow();
            assert_eq!(script.opens, vec![true, false]);
            assert_eq!(script.closed, 1);
            assert_eq!(script.finalized, 0);
        }
        assert!(cycle.is_bound());
        assert_eq!(cycle.phase(), CyclePhase::Idle);

        // The rejected time is not begun again
        assert_eq!(cycle.update(4.0, &settings, reopen(&mut source)), UpdateStep::Unchanged);
        assert_eq!(cycle.update(5.0, &settings, reopen(&mut source)), UpdateStep::Begun);
        assert_eq!(script.borrow().opens.len(), 2);
    }

    #[test]
    fn test_failed_reopen_idles_until_time_changes() {
        let (mut source, mut cycle) = bound_cycle();
        let script = source.script();
        let settings = PlayerConfig::default();
        {
            let mut script = script.borrow_mut();
            script.reject_requests = 1;
            script.fail_open = true;
        }

        assert_eq!(cycle.update(4.0, &settings, reopen(&mut source)), UpdateStep::Rejected(false));
        assert!(!cycle.is_bound());
        assert!(!cycle.late_update(4.0, &settings, reopen(&mut source)));

        assert_eq!(cycle.update(4.0, &settings, reopen(&mut source)), UpdateStep::Unbound);
        assert_eq!(script.borrow().opens.len(), 2);

        script.borrow_mut().fail_open = false;
        assert_eq!(cycle.update(6.0, &settings, reopen(&mut source)), UpdateStep::Reopened(true));
        assert_eq!(cycle.update(6.0, &settings, reopen(&mut source)), UpdateStep::Begun);
        assert_eq!(script.borrow().opens, vec![true, false, false]);
    }

    #[test]
    fn test_reopen_flag_set_by_automatic_reopen_only() {
        let (mut source, mut cycle) = bound_cycle();
        let script = source.script();
        let settings = PlayerConfig::default();
        assert!(!cycle.take_reopened());

        script.borrow_mut().reject_requests = 1;
        assert_eq!(cycle.update(1.0, &settings, reopen(&mut source)), UpdateStep::Rejected(true));
        assert!(cycle.take_reopened());
        assert!(!cycle.take_reopened());

        script.borrow_mut().reject_requests = 1;
        script.borrow_mut().fail_open = true;
        assert_eq!(cycle.update(2.0, &settings, reopen(&mut source)), UpdateStep::Rejected(false));
        assert!(!cycle.take_reopened());

        script.borrow_mut().fail_open = false;
        assert_eq!(cycle.update(3.0, &settings, reopen(&mut source)), UpdateStep::Reopened(true));
        assert!(cycle.take_reopened());
    }

    #[test]
    fn test_settings_pushed_before_request() {
        let (mut source, mut cycle) = bound_cycle();
        let settings = PlayerConfig::default()
            .with_async_load(false)
            .with_vertex_motion_scale(2.5);

        cycle.update(1.0, &settings, reopen(&mut source));

        let script = source.script();
        let script = script.borrow();
        assert_eq!(script.motion_scales, vec![2.5]);
        assert_eq!(script.requests, vec![(1.0, false)]);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let (mut source, mut cycle) = bound_cycle();
        cycle.update(1.0, &PlayerConfig::default(), reopen(&mut source));

        cycle.teardown();
        cycle.teardown();

        assert!(!cycle.is_bound());
        assert_eq!(cycle.phase(), CyclePhase::Idle);
        assert_eq!(source.script().borrow().closed, 1);
    }
}
