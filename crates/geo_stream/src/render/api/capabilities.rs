//! Runtime capability flags reported by a [`RenderDevice`](super::RenderDevice)

use bitflags::bitflags;

bitflags! {
    /// Feature tiers the instanced point renderer can take advantage of
    ///
    /// Queried from the device once per draw; a requested strategy is downgraded
    /// when the flag it needs is missing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderCapabilities: u32 {
        /// One draw call may render many copies of a mesh with per-instance matrices
        const INSTANCING = 1 << 0;
        /// Structured GPU buffers and indirect draw arguments are available
        const COMPUTE_BUFFERS = 1 << 1;
    }
}

impl RenderCapabilities {
    /// Hardware instancing is available
    pub const fn supports_instancing(self) -> bool {
        self.contains(Self::INSTANCING)
    }

    /// Compute buffers / indirect arguments are available
    pub const fn supports_compute_buffers(self) -> bool {
        self.contains(Self::COMPUTE_BUFFERS)
    }
}
