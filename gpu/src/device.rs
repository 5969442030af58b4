//! Graphics device.
//!
//! The [`GraphicsDevice`] owns the native device and is the entry point for
//! creating resources, submitting recorded command buffers and observing
//! their completion.
//!
//! # Submission lifecycle
//!
//! ```text
//! submit(cb)     cb: Recorded ──► Submitted, tokens move into the in-flight list
//! refresh()      for every in-flight fence that signaled:
//!                  release tokens, cb: Submitted ──► Completed, recycle fence
//! wait_for_idle  native idle wait, refresh, flush deferred disposals
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::backend::{
    FenceHandle, NativeDevice, PipelineHandle, PipelineLayoutHandle, ResourceSetHandle,
};
use crate::command::{
    CommandBuffer, CommandBufferPool, CommandBufferPoolDescriptor, CommandBufferPoolManager,
    CommandBufferShared, CommandBufferState, PoolState,
};
use crate::deferred::DeferredDisposalQueue;
use crate::error::{GpuError, GpuResult};
use crate::resource::{RefCountedResource, ResourceUsageToken};
use crate::resources::{Buffer, Fence, Framebuffer, Pipeline, ResourceSet, Texture};
use crate::types::{
    BufferDescriptor, DeviceLimits, PipelineDescriptor, ResourceLayoutDescriptor, TextureDescriptor,
};

/// Options for creating a [`GraphicsDevice`].
#[derive(Debug, Clone, Default)]
pub struct DeviceOptions {
    pub label: Option<String>,
    /// Descriptor used by [`GraphicsDevice::create_pool_manager`].
    pub pool_descriptor: CommandBufferPoolDescriptor,
}

impl DeviceOptions {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_pool_descriptor(mut self, descriptor: CommandBufferPoolDescriptor) -> Self {
        self.pool_descriptor = descriptor;
        self
    }
}

/// Work handed to the GPU whose completion has not been observed yet.
struct Submission {
    buffer: Arc<CommandBufferShared>,
    fence: FenceHandle,
    tokens: Vec<ResourceUsageToken>,
}

/// A graphics device for creating resources and submitting work.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync`. Submissions, completion polling and
/// deferred disposal may happen from any thread.
pub struct GraphicsDevice {
    native: Arc<dyn NativeDevice>,
    options: DeviceOptions,
    limits: DeviceLimits,
    in_flight: Mutex<Vec<Submission>>,
    free_fences: Mutex<Vec<FenceHandle>>,
    deferred: DeferredDisposalQueue,
    next_pool_id: AtomicU64,
}

impl GraphicsDevice {
    pub fn new(native: Arc<dyn NativeDevice>, options: DeviceOptions) -> Arc<Self> {
        let limits = native.limits();
        log::info!(
            "Created graphics device {} on {} backend",
            options.label.as_deref().unwrap_or("unlabeled"),
            native.name()
        );
        Arc::new(Self {
            native,
            options,
            limits,
            in_flight: Mutex::new(Vec::new()),
            free_fences: Mutex::new(Vec::new()),
            deferred: DeferredDisposalQueue::new(),
            next_pool_id: AtomicU64::new(1),
        })
    }

    pub fn native(&self) -> &Arc<dyn NativeDevice> {
        &self.native
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    pub(crate) fn next_pool_id(&self) -> u64 {
        self.next_pool_id.fetch_add(1, Ordering::Relaxed)
    }

    // Resource creation

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> GpuResult<Arc<Buffer>> {
        let buffer = Arc::new(Buffer::new(self.native.clone(), descriptor.clone())?);
        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );
        Ok(buffer)
    }

    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> GpuResult<Arc<Texture>> {
        let texture = Arc::new(Texture::new(self.native.clone(), descriptor.clone())?);
        log::trace!(
            "GraphicsDevice: created texture {:?}, {}x{} {:?}",
            descriptor.label,
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.format
        );
        Ok(texture)
    }

    pub fn create_framebuffer(
        &self,
        color_targets: Vec<Arc<Texture>>,
        depth_target: Option<Arc<Texture>>,
    ) -> GpuResult<Arc<Framebuffer>> {
        Ok(Arc::new(Framebuffer::new(color_targets, depth_target)?))
    }

    /// Create a fence, optionally already signaled.
    pub fn create_fence(&self, signaled: bool) -> GpuResult<Arc<Fence>> {
        Ok(Arc::new(Fence::new(self.native.clone(), signaled)?))
    }

    /// Take ownership of an externally compiled pipeline.
    pub fn import_pipeline(
        &self,
        handle: PipelineHandle,
        layout: PipelineLayoutHandle,
        descriptor: PipelineDescriptor,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(self.native.clone(), handle, layout, descriptor))
    }

    /// Take ownership of an externally allocated resource set.
    pub fn import_resource_set(
        &self,
        handle: ResourceSetHandle,
        layout: ResourceLayoutDescriptor,
        label: Option<String>,
    ) -> Arc<ResourceSet> {
        Arc::new(ResourceSet::new(self.native.clone(), handle, layout, label))
    }

    /// Create a standalone command buffer pool, not managed by a pool manager.
    pub fn create_command_pool(
        &self,
        descriptor: CommandBufferPoolDescriptor,
    ) -> GpuResult<Arc<CommandBufferPool>> {
        CommandBufferPool::new(
            self.native.clone(),
            self.next_pool_id(),
            descriptor,
            None,
            PoolState::Ready,
        )
    }

    /// Create a pool manager renting pools built from the device's default
    /// pool descriptor.
    pub fn create_pool_manager(self: &Arc<Self>) -> CommandBufferPoolManager {
        CommandBufferPoolManager::new(self.clone(), self.options.pool_descriptor.clone())
    }

    // Submission

    /// Submit a recorded command buffer.
    ///
    /// Resources referenced by the recording stay alive until
    /// [`refresh`](Self::refresh) observes the submission complete. If
    /// `fence` is given it is signaled once this and all earlier work
    /// finished.
    pub fn submit(&self, command_buffer: &CommandBuffer, fence: Option<&Fence>) -> GpuResult<()> {
        let shared = command_buffer.shared();
        shared.expect_state("submit", &[CommandBufferState::Recorded], "Recorded")?;

        let submit_fence = self.acquire_fence()?;
        if let Err(e) = self.native.submit(shared.handle(), submit_fence) {
            self.free_fences.lock().push(submit_fence);
            return Err(e);
        }

        // The work is on the GPU now, so it is tracked even if the pool
        // notification below fails.
        let transitioned = shared.transition(
            "submit",
            &[CommandBufferState::Recorded],
            "Recorded",
            CommandBufferState::Submitted,
        );

        let tokens = shared.take_tokens();
        log::trace!(
            "Submitted command buffer {} pinning {} resource(s)",
            shared.id(),
            tokens.len()
        );
        self.in_flight.lock().push(Submission {
            buffer: shared.clone(),
            fence: submit_fence,
            tokens,
        });

        if let Some(fence) = fence {
            self.native.signal_fence(fence.handle())?;
        }
        transitioned.map(|_| ())
    }

    /// Observe completed submissions without blocking.
    ///
    /// For every submission whose fence signaled: releases the resources it
    /// pinned and moves its command buffer to `Completed`, which may in turn
    /// complete and recycle its pool.
    pub fn refresh(&self) -> GpuResult<()> {
        let completed = {
            let mut in_flight = self.in_flight.lock();
            if in_flight.is_empty() {
                return Ok(());
            }
            let signaled = in_flight
                .iter()
                .map(|submission| self.native.fence_signaled(submission.fence))
                .collect::<GpuResult<Vec<bool>>>()?;

            let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut *in_flight)
                .into_iter()
                .zip(signaled)
                .partition(|(_, signaled)| *signaled);
            *in_flight = pending.into_iter().map(|(submission, _)| submission).collect();
            done
        };

        let mut first_error = None;
        for (submission, _) in completed {
            let Submission {
                buffer,
                fence,
                tokens,
            } = submission;
            drop(tokens);

            match buffer.transition(
                "complete",
                &[CommandBufferState::Submitted],
                "Submitted",
                CommandBufferState::Completed,
            ) {
                Ok(_) => log::trace!("Command buffer {} completed", buffer.id()),
                // Reset or disposed while in flight; nothing left to complete.
                Err(GpuError::InvalidCommandBufferState { .. }) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }

            if let Err(e) = self.recycle_fence(fence) {
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Number of submissions whose completion was not observed yet.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    // Synchronization

    /// Block until `fence` signals or `timeout_ns` elapses.
    ///
    /// Returns `Ok(false)` on timeout. Completed submissions are collected
    /// when the fence signaled.
    pub fn wait_for_fence(&self, fence: &Fence, timeout_ns: u64) -> GpuResult<bool> {
        let signaled = self.native.wait_fence(fence.handle(), timeout_ns)?;
        if signaled {
            self.refresh()?;
        }
        Ok(signaled)
    }

    pub fn reset_fence(&self, fence: &Fence) -> GpuResult<()> {
        self.native.reset_fence(fence.handle())
    }

    /// Queue `resource` for disposal at the next [`wait_for_idle`](Self::wait_for_idle).
    pub fn dispose_when_idle(&self, resource: Arc<dyn RefCountedResource>) {
        self.deferred.dispose_when_idle(resource);
    }

    /// Number of resources waiting for the next idle point.
    pub fn pending_disposals(&self) -> usize {
        self.deferred.pending_count()
    }

    /// Block until the GPU finished all submitted work, collect completions
    /// and dispose every resource queued with
    /// [`dispose_when_idle`](Self::dispose_when_idle).
    pub fn wait_for_idle(&self) -> GpuResult<()> {
        self.deferred.wait_for_idle(|| {
            self.native.wait_idle()?;
            self.refresh()
        })?;
        Ok(())
    }

    /// Wait for idle and release the device's internal fences.
    pub fn shutdown(&self) -> GpuResult<()> {
        self.wait_for_idle()?;
        self.destroy_free_fences();
        log::info!(
            "Graphics device {} shut down",
            self.options.label.as_deref().unwrap_or("unlabeled")
        );
        Ok(())
    }

    fn acquire_fence(&self) -> GpuResult<FenceHandle> {
        if let Some(fence) = self.free_fences.lock().pop() {
            return Ok(fence);
        }
        self.native.create_fence(false)
    }

    fn recycle_fence(&self, fence: FenceHandle) -> GpuResult<()> {
        if let Err(e) = self.native.reset_fence(fence) {
            self.native.destroy_fence(fence);
            return Err(e);
        }
        self.free_fences.lock().push(fence);
        Ok(())
    }

    fn destroy_free_fences(&self) {
        for fence in self.free_fences.lock().drain(..) {
            self.native.destroy_fence(fence);
        }
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_idle() {
            log::error!("Failed to wait for idle while dropping graphics device: {e}");
        }
        self.destroy_free_fences();
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("backend", &self.native.name())
            .field("label", &self.options.label)
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::resources::WAIT_FOREVER;
    use crate::types::{BufferUsage, CommandBufferUsage};

    fn device() -> (Arc<DummyDevice>, Arc<GraphicsDevice>) {
        let dummy = Arc::new(DummyDevice::new());
        let device = GraphicsDevice::new(dummy.clone(), DeviceOptions::default().with_label("test"));
        (dummy, device)
    }

    fn recorded(pool: &CommandBufferPool) -> CommandBuffer {
        let mut buffer = pool.allocate_command_buffer().unwrap();
        buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT).unwrap();
        buffer.end().unwrap();
        buffer
    }

    #[test]
    fn test_submit_requires_recorded() {
        let (_dummy, device) = device();
        let pool = device.create_command_pool(CommandBufferPoolDescriptor::new()).unwrap();
        let buffer = pool.allocate_command_buffer().unwrap();

        assert_eq!(
            device.submit(&buffer, None),
            Err(GpuError::InvalidCommandBufferState {
                operation: "submit",
                actual: CommandBufferState::Ready,
                expected: "Recorded",
            })
        );
    }

    #[test]
    fn test_refresh_completes_signaled_submissions() {
        let (dummy, device) = device();
        let pool = device.create_command_pool(CommandBufferPoolDescriptor::new()).unwrap();
        let buffer = recorded(&pool);

        device.submit(&buffer, None).unwrap();
        assert_eq!(buffer.state(), CommandBufferState::Submitted);
        assert_eq!(device.in_flight_count(), 1);

        device.refresh().unwrap();
        assert_eq!(buffer.state(), CommandBufferState::Submitted);

        dummy.complete_all();
        device.refresh().unwrap();
        assert_eq!(buffer.state(), CommandBufferState::Completed);
        assert_eq!(pool.state(), PoolState::Completed);
        assert_eq!(device.in_flight_count(), 0);
    }

    #[test]
    fn test_submission_pins_resources() {
        let (dummy, device) = device();
        let pool = device.create_command_pool(CommandBufferPoolDescriptor::new()).unwrap();
        let source = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::COPY_SRC))
            .unwrap();
        let destination = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::COPY_DST))
            .unwrap();

        let mut buffer = pool.allocate_command_buffer().unwrap();
        buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT).unwrap();
        buffer.copy_buffer(&source, 0, &destination, 0, 64).unwrap();
        buffer.end().unwrap();
        device.submit(&buffer, None).unwrap();

        source.dispose();
        destination.dispose();
        assert!(!source.is_destroyed());
        assert_eq!(dummy.live_buffers(), 2);

        dummy.complete_all();
        device.refresh().unwrap();
        assert!(source.is_destroyed());
        assert!(destination.is_destroyed());
        assert_eq!(dummy.live_buffers(), 0);
    }

    #[test]
    fn test_wait_for_fence_times_out_on_stalled_device() {
        let (dummy, device) = device();
        let pool = device.create_command_pool(CommandBufferPoolDescriptor::new()).unwrap();
        let buffer = recorded(&pool);
        let fence = device.create_fence(false).unwrap();

        device.submit(&buffer, Some(&fence)).unwrap();
        dummy.set_stalled(true);
        assert!(!device.wait_for_fence(&fence, 1_000).unwrap());
        assert_eq!(buffer.state(), CommandBufferState::Submitted);

        dummy.set_stalled(false);
        assert!(device.wait_for_fence(&fence, WAIT_FOREVER).unwrap());
        assert_eq!(buffer.state(), CommandBufferState::Completed);
    }

    #[test]
    fn test_internal_fences_are_recycled() {
        let (dummy, device) = device();
        let pool = device
            .create_command_pool(CommandBufferPoolDescriptor::new().resettable())
            .unwrap();
        let mut buffer = recorded(&pool);

        for _ in 0..4 {
            device.submit(&buffer, None).unwrap();
            device.wait_for_idle().unwrap();
            buffer.reset().unwrap();
            buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT).unwrap();
            buffer.end().unwrap();
        }
        assert_eq!(dummy.live_fences(), 1);

        device.shutdown().unwrap();
        assert_eq!(dummy.live_fences(), 0);
    }
}
