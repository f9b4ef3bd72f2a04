//! Playback time window
//!
//! Times are seconds. `start` and `end` are absolute source times, `current` is
//! relative to `start`. Once a media range is bound the window always satisfies
//!
//! ```text
//! media_start <= start <= end <= media_end
//! 0 <= current <= end - start
//! ```
//!
//! Before that the window is unbounded and only `start <= end` and the `current`
//! clamp apply.

/// Clamp without the panics of `f64::clamp`; NaN maps to `lo`
fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Start, end and current playback time of a stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamWindow {
    start: f64,
    end: f64,
    current: f64,
    media: Option<(f64, f64)>,
}

impl Default for StreamWindow {
    fn default() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
            current: 0.0,
            media: None,
        }
    }
}

impl StreamWindow {
    /// Unbounded window with `current` at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Window start, absolute
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Window end, absolute
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Playback time relative to `start`
    pub const fn current(&self) -> f64 {
        self.current
    }

    /// `end - start`
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Bound media range, if any
    pub const fn media_range(&self) -> Option<(f64, f64)> {
        self.media
    }

    /// Start of the media, or zero while unknown
    pub fn media_start(&self) -> f64 {
        self.media.map_or(0.0, |(start, _)| start)
    }

    /// End of the media, or zero while unknown
    pub fn media_end(&self) -> f64 {
        self.media.map_or(0.0, |(_, end)| end)
    }

    /// Length of the media, or zero while unknown
    pub fn media_duration(&self) -> f64 {
        self.media_end() - self.media_start()
    }

    /// Move the window start; NaN is ignored
    pub fn set_start(&mut self, start: f64) {
        if start.is_nan() {
            return;
        }
        let (lo, hi) = self.limits();
        self.start = clamp(start, lo, hi);
        if self.end < self.start {
            self.end = self.start;
        }
        self.clamp_current();
    }

    /// Move the window end; it never goes below `start`. NaN is ignored
    pub fn set_end(&mut self, end: f64) {
        if end.is_nan() {
            return;
        }
        let (_, hi) = self.limits();
        self.end = clamp(end, self.start, hi);
        self.clamp_current();
    }

    /// Set the relative playback time, clamped to `[0, duration]`
    pub fn set_current(&mut self, current: f64) {
        self.current = if current.is_nan() { 0.0 } else { current };
        self.clamp_current();
    }

    /// Absolute time to sample: `start + current`
    pub fn absolute_sample_time(&self) -> f64 {
        self.start + self.current
    }

    /// Set playback from an absolute source time
    pub fn set_absolute_time(&mut self, time: f64) {
        self.set_current(time - self.start);
    }

    /// Bind a new media range and pull the window back inside it
    ///
    /// `current` keeps its relative value when it still fits. Ranges that are not
    /// finite are ignored; a reversed range collapses to its start.
    pub fn bind_media_range(&mut self, start: f64, end: f64) -> bool {
        if !start.is_finite() || !end.is_finite() {
            log::warn!("Ignoring non-finite media range [{start}, {end}]");
            return false;
        }
        self.media = Some((start, end.max(start)));
        self.reclamp();
        true
    }

    /// Span the whole media range
    pub fn reset_to_media_range(&mut self) {
        if let Some((start, end)) = self.media {
            self.start = start;
            self.end = end;
            self.clamp_current();
        }
    }

    /// Re-apply every clamp against the current media range
    pub fn reclamp(&mut self) {
        let (lo, hi) = self.limits();
        self.start = clamp(self.start, lo, hi);
        self.end = clamp(self.end, self.start, hi);
        self.clamp_current();
    }

    fn limits(&self) -> (f64, f64) {
        self.media.unwrap_or((f64::NEG_INFINITY, f64::INFINITY))
    }

    fn clamp_current(&mut self) {
        let duration = self.duration();
        // infinite - infinite
        let duration = if duration.is_nan() { 0.0 } else { duration };
        self.current = clamp(self.current, 0.0, duration);
    }
}
