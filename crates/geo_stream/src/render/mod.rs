//! # Rendering
//!
//! Instanced rendering of streamed point sets.
//!
//! ## Architecture
//!
//! ```text
//! PointSet ──► PointsRenderer ──► select_mode (capability downgrade)
//!                   │
//!                   ├── Procedural:   BufferSet ──► draw_mesh_instanced_indirect
//!                   ├── Instancing:   InstanceBatcher ──► draw_mesh_instanced
//!                   └── NoInstancing: draw_mesh (one per point)
//! ```
//!
//! Everything device-specific goes through the [`api::RenderDevice`] trait.

pub mod api;
pub mod points;

pub use api::{RenderCapabilities, RenderDevice};
pub use points::{FlushOutcome, InstancingMode, PointSet, PointsRenderer};

/// Errors reported by a rendering device
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Resource creation or management failed
    ///
    /// Occurs when GPU buffers cannot be created, typically due to memory
    /// constraints or an invalid size.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Uploading data into an existing buffer failed
    #[error("Buffer upload failed: {0}")]
    UploadFailed(String),

    /// A draw call could not be recorded
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Backend-specific error occurred
    ///
    /// Wraps errors of the concrete graphics API in a generic form.
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
