//! Common utilities for control-plane integration tests.
//!
//! Every test runs against the dummy backend, which completes submitted work
//! only when told to, so completion ordering is deterministic.

use std::sync::Arc;

use redlilium_gpu::backend::{PipelineHandle, PipelineLayoutHandle, ResourceSetHandle};
use redlilium_gpu::types::{OutputDescription, PipelineDescriptor, ResourceLayoutDescriptor};
use redlilium_gpu::{
    Buffer, BufferDescriptor, BufferUsage, CommandBuffer, CommandBufferPool, CommandBufferUsage,
    DeviceOptions, DummyDevice, Framebuffer, GraphicsDevice, Pipeline, RefCountedResource,
    ResourceSet, Texture, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Format of the color targets created by [`TestContext::create_framebuffer`].
pub const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// A dummy native device wrapped in a graphics device.
pub struct TestContext {
    pub dummy: Arc<DummyDevice>,
    pub device: Arc<GraphicsDevice>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_dummy(DummyDevice::new())
    }

    /// Submitted work completes as soon as it is submitted.
    #[allow(dead_code)]
    pub fn auto_complete() -> Self {
        Self::with_dummy(DummyDevice::new().with_auto_complete())
    }

    fn with_dummy(dummy: DummyDevice) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dummy = Arc::new(dummy);
        let device = GraphicsDevice::new(dummy.clone(), DeviceOptions::default().with_label("test"));
        Self { dummy, device }
    }

    pub fn create_buffer(&self, size: u64, usage: BufferUsage) -> Arc<Buffer> {
        self.device
            .create_buffer(&BufferDescriptor::new(size, usage))
            .expect("Failed to create buffer")
    }

    #[allow(dead_code)]
    pub fn create_texture(&self, width: u32, height: u32, format: TextureFormat) -> Arc<Texture> {
        let usage = if format.is_depth() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::RENDER_TARGET
        };
        self.device
            .create_texture(&TextureDescriptor::new_2d(width, height, format, usage))
            .expect("Failed to create texture")
    }

    /// A 64x64 framebuffer with one color target in [`COLOR_FORMAT`].
    #[allow(dead_code)]
    pub fn create_framebuffer(&self) -> Arc<Framebuffer> {
        let color = self.create_texture(64, 64, COLOR_FORMAT);
        let framebuffer = self
            .device
            .create_framebuffer(vec![color.clone()], None)
            .expect("Failed to create framebuffer");
        // The framebuffer holds its own reference.
        color.dispose();
        framebuffer
    }

    /// A graphics pipeline rendering into `outputs`.
    #[allow(dead_code)]
    pub fn import_graphics_pipeline(
        &self,
        outputs: OutputDescription,
        layouts: &[ResourceLayoutDescriptor],
    ) -> Arc<Pipeline> {
        let descriptor = layouts
            .iter()
            .fold(PipelineDescriptor::graphics(outputs), |descriptor, layout| {
                descriptor.with_resource_layout(*layout)
            });
        self.device.import_pipeline(
            PipelineHandle(self.dummy.next_raw_handle()),
            PipelineLayoutHandle(self.dummy.next_raw_handle()),
            descriptor,
        )
    }

    #[allow(dead_code)]
    pub fn import_compute_pipeline(&self, layouts: &[ResourceLayoutDescriptor]) -> Arc<Pipeline> {
        let descriptor = layouts
            .iter()
            .fold(PipelineDescriptor::compute(), |descriptor, layout| {
                descriptor.with_resource_layout(*layout)
            });
        self.device.import_pipeline(
            PipelineHandle(self.dummy.next_raw_handle()),
            PipelineLayoutHandle(self.dummy.next_raw_handle()),
            descriptor,
        )
    }

    #[allow(dead_code)]
    pub fn import_resource_set(&self, layout: ResourceLayoutDescriptor) -> Arc<ResourceSet> {
        self.device.import_resource_set(
            ResourceSetHandle(self.dummy.next_raw_handle()),
            layout,
            Some("test set".to_string()),
        )
    }

    /// A buffer of `pool` in the `Recording` state.
    pub fn recording(&self, pool: &CommandBufferPool) -> CommandBuffer {
        let mut buffer = pool
            .allocate_command_buffer()
            .expect("Failed to allocate command buffer");
        buffer
            .begin(CommandBufferUsage::ONE_TIME_SUBMIT)
            .expect("Failed to begin recording");
        buffer
    }
}

/// Outputs of a framebuffer made by [`TestContext::create_framebuffer`].
#[allow(dead_code)]
pub fn color_outputs() -> OutputDescription {
    OutputDescription {
        color_formats: vec![COLOR_FORMAT],
        depth_format: None,
        sample_count: 1,
    }
}
