//! Public rendering API
//!
//! This module contains the device contract the point renderer is written
//! against and the capability flags it queries.

pub mod capabilities;
pub mod device;

// Re-export commonly used types
pub use capabilities::RenderCapabilities;
pub use device::{
    BufferDescriptor, BufferHandle, BufferKind, DrawMesh, DrawMeshIndirect, DrawMeshInstanced,
    DrawSettings, MaterialHandle, MeshHandle, PropertyBlock, RenderDevice, ShadowCasting,
};
