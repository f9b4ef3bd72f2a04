//! Error taxonomy shared by the streaming and rendering halves of the crate
//!
//! None of these conditions is fatal. Each is either logged once as a warning,
//! handled by an automatic reload, or turned into "nothing renders this frame".

use crate::render::InstancingMode;

/// Why a point dispatch was skipped without touching the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DegenerateInput {
    /// No mesh assigned to the renderer
    NoMesh,
    /// No material assigned, or the mesh has no submesh a material could cover
    NoMaterials,
    /// No point set, or a point set with zero points
    NoPoints,
}

impl std::fmt::Display for DegenerateInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMesh => write!(f, "no mesh assigned"),
            Self::NoMaterials => write!(f, "no materials assigned"),
            Self::NoPoints => write!(f, "no points to draw"),
        }
    }
}

/// Streaming and dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Opening or reopening a source failed
    ///
    /// Leaves the player unbound; reported as a warning.
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable {
        /// Path of the source that failed to open
        path: String,
        /// What the source collaborator reported
        reason: String,
    },

    /// The source refused a sample request, usually because the file behind it
    /// was replaced or removed mid-session
    ///
    /// Triggers an automatic reload and is never surfaced to the caller.
    #[error("Sample request rejected at t={time}")]
    SampleRejected {
        /// Absolute source time of the rejected request
        time: f64,
    },

    /// The requested render strategy is not supported by the device
    ///
    /// The strategy is downgraded with a single warning; the draw still happens.
    #[error("{requested:?} is not supported on this device, falling back to {fallback:?}")]
    CapabilityUnsupported {
        /// Mode that was asked for
        requested: InstancingMode,
        /// Mode that will be used instead
        fallback: InstancingMode,
    },

    /// Nothing to draw; the dispatch is skipped silently
    #[error("Dispatch skipped: {0}")]
    DegenerateInput(DegenerateInput),
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;
