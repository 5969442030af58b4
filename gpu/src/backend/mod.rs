//! Native execution API abstraction.
//!
//! The control plane never talks to a driver directly. Everything it needs
//! from the underlying API goes through the object-safe [`NativeDevice`]
//! trait, with native objects passed around as opaque `u64` handles.
//!
//! # Available Backends
//!
//! - [`dummy`]: simulated GPU with controllable completion, always built
//! - `vulkan` (feature `vulkan-backend`): ash on an externally created device

pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

pub use dummy::DummyDevice;

#[cfg(feature = "vulkan-backend")]
pub use vulkan::VulkanDevice;

use crate::error::GpuResult;
use crate::types::{
    BufferDescriptor, CommandBufferUsage, DeviceLimits, Extent2d, IndexFormat, PipelineKind,
    ScissorRect, TextureDescriptor, TextureFormat, TextureLayout, Viewport,
};

macro_rules! native_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);

            impl $name {
                pub const NULL: Self = Self(0);

                pub fn raw(self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

native_handle! {
    /// Handle to a native command pool.
    CommandPoolHandle;
    /// Handle to a native command buffer.
    CommandBufferHandle;
    /// Handle to a native fence.
    FenceHandle;
    /// Handle to a native buffer.
    BufferHandle;
    /// Handle to a native image.
    TextureHandle;
    /// Handle to a native image view.
    TextureViewHandle;
    /// Handle to a native pipeline.
    PipelineHandle;
    /// Handle to a native pipeline layout.
    PipelineLayoutHandle;
    /// Handle to a native descriptor / resource set.
    ResourceSetHandle;
    /// Handle to a native swapchain.
    SwapchainHandle;
}

/// Creation parameters of a native command pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativePoolInfo {
    /// Buffers are short-lived; a hint for the driver's allocator.
    pub transient: bool,
    /// Buffers may be reset individually.
    pub can_reset: bool,
}

/// A single recorded command, as handed to [`NativeDevice::encode`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCommand {
    BeginRendering {
        colors: Vec<TextureViewHandle>,
        depth: Option<TextureViewHandle>,
        depth_has_stencil: bool,
        extent: Extent2d,
    },
    EndRendering,
    BindPipeline {
        kind: PipelineKind,
        pipeline: PipelineHandle,
    },
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
        offset: u64,
    },
    BindResourceSet {
        kind: PipelineKind,
        layout: PipelineLayoutHandle,
        slot: u32,
        set: ResourceSetHandle,
        dynamic_offsets: Vec<u32>,
    },
    SetViewport {
        index: u32,
        viewport: Viewport,
    },
    SetScissor {
        index: u32,
        rect: ScissorRect,
    },
    ClearColor {
        index: u32,
        color: [f32; 4],
        extent: Extent2d,
    },
    ClearDepthStencil {
        depth: f32,
        stencil: u8,
        has_stencil: bool,
        extent: Extent2d,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirect {
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    DispatchIndirect {
        buffer: BufferHandle,
        offset: u64,
    },
    CopyBuffer {
        source: BufferHandle,
        source_offset: u64,
        destination: BufferHandle,
        destination_offset: u64,
        size: u64,
    },
    TransitionLayout {
        texture: TextureHandle,
        format: TextureFormat,
        from: TextureLayout,
        to: TextureLayout,
    },
}

/// The native execution API consumed by the control plane.
///
/// Implementations must be callable from any thread. Recording into one
/// command buffer is externally serialized by the caller; everything else may
/// be called concurrently.
pub trait NativeDevice: Send + Sync + 'static {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Limits consulted by validation.
    fn limits(&self) -> DeviceLimits;

    // Command pools and buffers

    fn create_command_pool(&self, info: NativePoolInfo) -> GpuResult<CommandPoolHandle>;

    fn reset_command_pool(&self, pool: CommandPoolHandle, release_resources: bool)
    -> GpuResult<()>;

    fn destroy_command_pool(&self, pool: CommandPoolHandle);

    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> GpuResult<CommandBufferHandle>;

    fn begin_command_buffer(
        &self,
        buffer: CommandBufferHandle,
        usage: CommandBufferUsage,
    ) -> GpuResult<()>;

    fn end_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()>;

    fn reset_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()>;

    /// Record one command into a buffer that is in the recording state.
    fn encode(&self, buffer: CommandBufferHandle, command: &NativeCommand);

    // Submission and synchronization

    /// Submit a recorded buffer; `fence` signals when it finished executing.
    fn submit(&self, buffer: CommandBufferHandle, fence: FenceHandle) -> GpuResult<()>;

    /// Signal `fence` once all previously submitted work finished.
    fn signal_fence(&self, fence: FenceHandle) -> GpuResult<()>;

    fn create_fence(&self, signaled: bool) -> GpuResult<FenceHandle>;

    fn destroy_fence(&self, fence: FenceHandle);

    fn fence_signaled(&self, fence: FenceHandle) -> GpuResult<bool>;

    /// Block until `fence` signals or `timeout_ns` elapses.
    ///
    /// Returns `Ok(false)` on timeout. `u64::MAX` waits forever.
    fn wait_fence(&self, fence: FenceHandle, timeout_ns: u64) -> GpuResult<bool>;

    fn reset_fence(&self, fence: FenceHandle) -> GpuResult<()>;

    /// Block until no submitted work remains outstanding.
    fn wait_idle(&self) -> GpuResult<()>;

    // Resources

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GpuResult<BufferHandle>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    fn create_texture(&self, descriptor: &TextureDescriptor) -> GpuResult<TextureHandle>;

    fn destroy_texture(&self, texture: TextureHandle);

    fn create_texture_view(
        &self,
        texture: TextureHandle,
        format: TextureFormat,
    ) -> GpuResult<TextureViewHandle>;

    fn destroy_texture_view(&self, view: TextureViewHandle);

    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    fn free_resource_set(&self, set: ResourceSetHandle);

    // Presentation

    /// The images currently owned by `swapchain`, in image-index order.
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> GpuResult<Vec<TextureHandle>>;
}
