//! Dummy backend that simulates a GPU in host memory.
//!
//! Nothing is rendered. The backend keeps enough bookkeeping to exercise the
//! control plane deterministically:
//!
//! - every native object is tracked, so tests can check for leaks
//! - encoded commands are stored per command buffer
//! - submitted work completes immediately (`auto_complete`) or only when the
//!   test calls [`DummyDevice::complete_all`] / [`DummyDevice::complete_next`]
//! - a `stalled` device never completes work on a timed fence wait

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{
    BufferHandle, CommandBufferHandle, CommandPoolHandle, FenceHandle, NativeCommand,
    NativeDevice, NativePoolInfo, PipelineHandle, ResourceSetHandle, SwapchainHandle,
    TextureHandle, TextureViewHandle,
};
use crate::error::{GpuError, GpuResult};
use crate::types::{
    BufferDescriptor, CommandBufferUsage, DeviceLimits, TextureDescriptor, TextureFormat,
};

#[derive(Debug, Default)]
struct DummyCommandBuffer {
    pool: u64,
    recording: bool,
    commands: Vec<NativeCommand>,
}

#[derive(Debug, Default)]
struct DummyState {
    command_pools: HashSet<u64>,
    command_buffers: HashMap<u64, DummyCommandBuffer>,
    fences: HashMap<u64, bool>,
    /// Fences of submitted work, in submission order.
    pending: VecDeque<u64>,
    buffers: HashSet<u64>,
    textures: HashSet<u64>,
    texture_views: HashSet<u64>,
    swapchains: HashMap<u64, Vec<u64>>,
    /// Texture view creation fails once this many views are live.
    view_limit: Option<usize>,
    destroyed_pipelines: Vec<u64>,
    freed_resource_sets: Vec<u64>,
    submissions: Vec<u64>,
}

impl DummyState {
    fn complete_through(&mut self, fence: Option<u64>) {
        while let Some(next) = self.pending.pop_front() {
            self.fences.insert(next, true);
            if Some(next) == fence {
                break;
            }
        }
    }
}

/// Simulated native device.
pub struct DummyDevice {
    state: Mutex<DummyState>,
    next_handle: AtomicU64,
    auto_complete: AtomicBool,
    stalled: AtomicBool,
    limits: DeviceLimits,
}

impl DummyDevice {
    /// Create a device whose submitted work stays pending until completed
    /// explicitly or waited on.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState::default()),
            next_handle: AtomicU64::new(1),
            auto_complete: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            limits: DeviceLimits::default(),
        }
    }

    /// Complete every submission as soon as it is made.
    pub fn with_auto_complete(self) -> Self {
        self.auto_complete.store(true, Ordering::Release);
        self
    }

    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::Release);
        if enabled {
            self.complete_all();
        }
    }

    /// While stalled, timed fence waits give up instead of completing work.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::Release);
    }

    /// Finish all outstanding GPU work.
    pub fn complete_all(&self) {
        self.state.lock().complete_through(None);
    }

    /// Finish the oldest outstanding submission. Returns `false` if none.
    pub fn complete_next(&self) -> bool {
        let mut state = self.state.lock();
        match state.pending.pop_front() {
            Some(fence) => {
                state.fences.insert(fence, true);
                true
            }
            None => false,
        }
    }

    /// Create a fake swapchain owning `image_count` images.
    pub fn create_swapchain(&self, image_count: usize) -> SwapchainHandle {
        let handle = self.next();
        let images = (0..image_count).map(|_| self.next()).collect();
        self.state.lock().swapchains.insert(handle, images);
        SwapchainHandle(handle)
    }

    /// Make texture view creation fail while `limit` views are live.
    pub fn limit_texture_views(&self, limit: Option<usize>) {
        self.state.lock().view_limit = limit;
    }

    pub fn pending_submissions(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    pub fn recorded_commands(&self, buffer: CommandBufferHandle) -> Vec<NativeCommand> {
        self.state
            .lock()
            .command_buffers
            .get(&buffer.0)
            .map(|cb| cb.commands.clone())
            .unwrap_or_default()
    }

    pub fn live_command_pools(&self) -> usize {
        self.state.lock().command_pools.len()
    }

    pub fn live_command_buffers(&self) -> usize {
        self.state.lock().command_buffers.len()
    }

    pub fn live_fences(&self) -> usize {
        self.state.lock().fences.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn live_texture_views(&self) -> usize {
        self.state.lock().texture_views.len()
    }

    pub fn destroyed_pipelines(&self) -> Vec<PipelineHandle> {
        let state = self.state.lock();
        state.destroyed_pipelines.iter().copied().map(PipelineHandle).collect()
    }

    pub fn freed_resource_sets(&self) -> Vec<ResourceSetHandle> {
        let state = self.state.lock();
        state.freed_resource_sets.iter().copied().map(ResourceSetHandle).collect()
    }

    /// Hand out a fresh handle value, e.g. for importing a fake pipeline.
    pub fn next_raw_handle(&self) -> u64 {
        self.next()
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, state: &mut DummyState, fence: u64) {
        state.fences.insert(fence, false);
        state.pending.push_back(fence);
        if self.auto_complete.load(Ordering::Acquire) {
            state.complete_through(None);
        }
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DummyDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyDevice")
            .field("pending", &self.pending_submissions())
            .field("auto_complete", &self.auto_complete.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl NativeDevice for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_command_pool(&self, _info: NativePoolInfo) -> GpuResult<CommandPoolHandle> {
        let handle = self.next();
        self.state.lock().command_pools.insert(handle);
        Ok(CommandPoolHandle(handle))
    }

    fn reset_command_pool(
        &self,
        pool: CommandPoolHandle,
        _release_resources: bool,
    ) -> GpuResult<()> {
        let mut state = self.state.lock();
        if !state.command_pools.contains(&pool.0) {
            return Err(GpuError::Native(format!("unknown command pool {}", pool.0)));
        }
        for buffer in state.command_buffers.values_mut() {
            if buffer.pool == pool.0 {
                buffer.recording = false;
                buffer.commands.clear();
            }
        }
        Ok(())
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        let mut state = self.state.lock();
        state.command_pools.remove(&pool.0);
        state.command_buffers.retain(|_, buffer| buffer.pool != pool.0);
    }

    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> GpuResult<CommandBufferHandle> {
        let handle = self.next();
        let mut state = self.state.lock();
        if !state.command_pools.contains(&pool.0) {
            return Err(GpuError::Native(format!("unknown command pool {}", pool.0)));
        }
        state.command_buffers.insert(
            handle,
            DummyCommandBuffer {
                pool: pool.0,
                ..Default::default()
            },
        );
        Ok(CommandBufferHandle(handle))
    }

    fn begin_command_buffer(
        &self,
        buffer: CommandBufferHandle,
        _usage: CommandBufferUsage,
    ) -> GpuResult<()> {
        let mut state = self.state.lock();
        let cb = state
            .command_buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| GpuError::Native(format!("unknown command buffer {}", buffer.0)))?;
        if cb.recording {
            return Err(GpuError::Native("command buffer already recording".into()));
        }
        cb.recording = true;
        cb.commands.clear();
        Ok(())
    }

    fn end_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()> {
        let mut state = self.state.lock();
        let cb = state
            .command_buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| GpuError::Native(format!("unknown command buffer {}", buffer.0)))?;
        if !cb.recording {
            return Err(GpuError::Native("command buffer not recording".into()));
        }
        cb.recording = false;
        Ok(())
    }

    fn reset_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()> {
        let mut state = self.state.lock();
        let cb = state
            .command_buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| GpuError::Native(format!("unknown command buffer {}", buffer.0)))?;
        cb.recording = false;
        cb.commands.clear();
        Ok(())
    }

    fn encode(&self, buffer: CommandBufferHandle, command: &NativeCommand) {
        let mut state = self.state.lock();
        match state.command_buffers.get_mut(&buffer.0) {
            Some(cb) if cb.recording => cb.commands.push(command.clone()),
            _ => log::error!("Dummy: encode into command buffer {} outside recording", buffer.0),
        }
    }

    fn submit(&self, buffer: CommandBufferHandle, fence: FenceHandle) -> GpuResult<()> {
        let mut state = self.state.lock();
        match state.command_buffers.get(&buffer.0) {
            Some(cb) if !cb.recording => {}
            Some(_) => return Err(GpuError::Native("submitted a recording command buffer".into())),
            None => return Err(GpuError::Native(format!("unknown command buffer {}", buffer.0))),
        }
        if !state.fences.contains_key(&fence.0) {
            return Err(GpuError::Native(format!("unknown fence {}", fence.0)));
        }
        state.submissions.push(buffer.0);
        self.enqueue(&mut state, fence.0);
        Ok(())
    }

    fn signal_fence(&self, fence: FenceHandle) -> GpuResult<()> {
        let mut state = self.state.lock();
        if !state.fences.contains_key(&fence.0) {
            return Err(GpuError::Native(format!("unknown fence {}", fence.0)));
        }
        self.enqueue(&mut state, fence.0);
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> GpuResult<FenceHandle> {
        let handle = self.next();
        self.state.lock().fences.insert(handle, signaled);
        Ok(FenceHandle(handle))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut state = self.state.lock();
        state.fences.remove(&fence.0);
        state.pending.retain(|pending| *pending != fence.0);
    }

    fn fence_signaled(&self, fence: FenceHandle) -> GpuResult<bool> {
        self.state
            .lock()
            .fences
            .get(&fence.0)
            .copied()
            .ok_or_else(|| GpuError::Native(format!("unknown fence {}", fence.0)))
    }

    fn wait_fence(&self, fence: FenceHandle, timeout_ns: u64) -> GpuResult<bool> {
        let mut state = self.state.lock();
        match state.fences.get(&fence.0) {
            Some(true) => return Ok(true),
            Some(false) => {}
            None => return Err(GpuError::Native(format!("unknown fence {}", fence.0))),
        }
        if timeout_ns == 0 || self.stalled.load(Ordering::Acquire) {
            return Ok(false);
        }
        if !state.pending.contains(&fence.0) {
            // Never submitted: nothing will ever signal it.
            return Ok(false);
        }
        state.complete_through(Some(fence.0));
        Ok(true)
    }

    fn reset_fence(&self, fence: FenceHandle) -> GpuResult<()> {
        let mut state = self.state.lock();
        match state.fences.get_mut(&fence.0) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(GpuError::Native(format!("unknown fence {}", fence.0))),
        }
    }

    fn wait_idle(&self) -> GpuResult<()> {
        self.complete_all();
        Ok(())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GpuResult<BufferHandle> {
        if descriptor.size == 0 {
            return Err(GpuError::ResourceCreationFailed(
                "buffer size cannot be zero".to_string(),
            ));
        }
        let handle = self.next();
        self.state.lock().buffers.insert(handle);
        Ok(BufferHandle(handle))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(&buffer.0);
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> GpuResult<TextureHandle> {
        if descriptor.extent.width == 0 || descriptor.extent.height == 0 {
            return Err(GpuError::ResourceCreationFailed(
                "texture dimensions cannot be zero".to_string(),
            ));
        }
        let handle = self.next();
        self.state.lock().textures.insert(handle);
        Ok(TextureHandle(handle))
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        self.state.lock().textures.remove(&texture.0);
    }

    fn create_texture_view(
        &self,
        _texture: TextureHandle,
        _format: TextureFormat,
    ) -> GpuResult<TextureViewHandle> {
        let mut state = self.state.lock();
        if let Some(limit) = state.view_limit
            && state.texture_views.len() >= limit
        {
            return Err(GpuError::ResourceCreationFailed(format!(
                "texture view limit of {limit} reached"
            )));
        }
        let handle = self.next();
        state.texture_views.insert(handle);
        Ok(TextureViewHandle(handle))
    }

    fn destroy_texture_view(&self, view: TextureViewHandle) {
        self.state.lock().texture_views.remove(&view.0);
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.state.lock().destroyed_pipelines.push(pipeline.0);
    }

    fn free_resource_set(&self, set: ResourceSetHandle) {
        self.state.lock().freed_resource_sets.push(set.0);
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> GpuResult<Vec<TextureHandle>> {
        self.state
            .lock()
            .swapchains
            .get(&swapchain.0)
            .map(|images| images.iter().copied().map(TextureHandle).collect())
            .ok_or_else(|| GpuError::Native(format!("unknown swapchain {}", swapchain.0)))
    }
}

static_assertions::assert_impl_all!(DummyDevice: Send, Sync);
