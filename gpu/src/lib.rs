//! # RedLilium GPU
//!
//! Resource lifetime and command recording control plane for RedLilium.
//!
//! ## Overview
//!
//! This crate sits between the renderer and a native execution API and
//! provides:
//! - [`resource`] - Explicit reference counting with deterministic native release
//! - [`CommandBuffer`] - State-checked command recording with resource tracking
//! - [`CommandBufferPoolManager`] - Thread-safe renting of command pools
//! - [`GraphicsDevice`] - Submission, fence completion and deferred disposal
//! - [`SwapImageTargetSet`] - Per-swap-image color targets and framebuffers
//! - [`backend`] - The [`NativeDevice`] seam, with Vulkan and Dummy implementations
//!
//! Validation of API usage (buffer usage flags, indirect strides, dynamic
//! offsets, use after destroy) is compiled in with the `validation` feature.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_gpu::{DeviceOptions, DummyDevice, GraphicsDevice, CommandBufferUsage};
//!
//! let device = GraphicsDevice::new(Arc::new(DummyDevice::new()), DeviceOptions::default());
//! let manager = device.create_pool_manager();
//!
//! let pool = manager.rent()?;
//! let mut cb = pool.allocate_command_buffer()?;
//! cb.begin(CommandBufferUsage::ONE_TIME_SUBMIT)?;
//! // record...
//! cb.end()?;
//! device.submit(&cb, None)?;
//! manager.return_when_complete(&pool)?;
//! ```

pub mod backend;
pub mod command;
pub mod deferred;
pub mod device;
pub mod error;
pub mod resource;
pub mod resources;
pub mod swapchain;
pub mod types;

// Re-export main types for convenience
pub use backend::{DummyDevice, NativeDevice};
#[cfg(feature = "vulkan-backend")]
pub use backend::VulkanDevice;
pub use command::{
    CommandBuffer, CommandBufferPool, CommandBufferPoolDescriptor, CommandBufferPoolManager,
    CommandBufferState, PoolState,
};
pub use deferred::DeferredDisposalQueue;
pub use device::{DeviceOptions, GraphicsDevice};
pub use error::{GpuError, GpuResult};
pub use resource::{Destroyable, RefCount, RefCountedResource, ResourceUsageToken};
pub use resources::{Buffer, Fence, Framebuffer, Pipeline, ResourceSet, Texture, WAIT_FOREVER};
pub use swapchain::{SwapImageTargetDescriptor, SwapImageTargetSet};
pub use types::{
    BufferDescriptor, BufferUsage, CommandBufferUsage, Extent2d, IndexFormat, PipelineKind,
    TextureDescriptor, TextureFormat, TextureLayout, TextureUsage,
};

/// GPU library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the GPU subsystem.
///
/// Only logs the version; devices are created explicitly.
pub fn init() {
    log::info!("RedLilium GPU v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_device() {
        let device = GraphicsDevice::new(Arc::new(DummyDevice::new()), DeviceOptions::default());
        assert_eq!(device.native().name(), "Dummy");
        assert_eq!(device.in_flight_count(), 0);
    }
}
