//! # Streaming
//!
//! Time-windowed playback of a stream source.
//!
//! - [`window::StreamWindow`]: start/end/current bookkeeping and clamping
//! - [`cycle::UpdateCycle`]: begin/end sample state machine and reload on rejection
//! - [`player::StreamPlayer`]: load, enable/disable and per-frame driving

pub mod cycle;
pub mod player;
pub mod window;

pub use cycle::{CyclePhase, UpdateCycle, UpdateStep};
pub use player::StreamPlayer;
pub use window::StreamWindow;
