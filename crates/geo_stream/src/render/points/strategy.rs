//! Render strategy selection
//!
//! Maps a requested [`InstancingMode`] onto what the device can actually do.
//! Downgrades are applied in a fixed order and only ever move towards
//! [`InstancingMode::NoInstancing`], so running the selector on its own output
//! is a no-op.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::render::api::RenderCapabilities;

/// Draw path used for a point set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstancingMode {
    /// One draw call per point per submesh
    NoInstancing,
    /// CPU-built matrices, batches of at most [`MAX_INSTANCES_PER_DRAW`](super::MAX_INSTANCES_PER_DRAW)
    #[default]
    Instancing,
    /// Points live in a GPU buffer; one indirect draw per submesh
    Procedural,
}

/// One step of capability fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downgrade {
    /// Mode before the step
    pub from: InstancingMode,
    /// Mode after the step
    pub to: InstancingMode,
    /// Capability whose absence forced the step
    pub missing: RenderCapabilities,
}

impl From<Downgrade> for StreamError {
    fn from(downgrade: Downgrade) -> Self {
        Self::CapabilityUnsupported {
            requested: downgrade.from,
            fallback: downgrade.to,
        }
    }
}

/// Outcome of [`select_mode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    /// Mode to dispatch with
    pub mode: InstancingMode,
    /// Fallback steps taken, in order
    pub downgrades: Vec<Downgrade>,
}

impl ModeSelection {
    /// Whether the requested mode was kept
    pub fn is_unchanged(&self) -> bool {
        self.downgrades.is_empty()
    }
}

/// Resolve `requested` against the device capabilities
pub fn select_mode(requested: InstancingMode, capabilities: RenderCapabilities) -> ModeSelection {
    let mut mode = requested;
    let mut downgrades = Vec::new();

    if !capabilities.supports_instancing() && mode != InstancingMode::NoInstancing {
        downgrades.push(Downgrade {
            from: mode,
            to: InstancingMode::NoInstancing,
            missing: RenderCapabilities::INSTANCING,
        });
        mode = InstancingMode::NoInstancing;
    }

    if mode == InstancingMode::Procedural && !capabilities.supports_compute_buffers() {
        downgrades.push(Downgrade {
            from: mode,
            to: InstancingMode::Instancing,
            missing: RenderCapabilities::COMPUTE_BUFFERS,
        });
        mode = InstancingMode::Instancing;
    }

    ModeSelection { mode, downgrades }
}
