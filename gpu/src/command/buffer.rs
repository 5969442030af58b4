//! Command buffer recording.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::pool::CommandBufferPool;
use super::{CommandBufferState, PoolState};
use crate::backend::{CommandBufferHandle, NativeCommand, NativeDevice};
use crate::error::{GpuError, GpuResult};
use crate::resource::{RefCountedResource, ResourceKey, ResourceUsageToken};
use crate::resources::{Buffer, Framebuffer, Pipeline, ResourceSet, Texture};
use crate::types::{
    CommandBufferUsage, DeviceLimits, IndexFormat, PipelineKind, ScissorRect, TextureLayout,
    Viewport,
};

#[cfg(feature = "validation")]
use super::validation;
#[cfg(feature = "validation")]
use crate::types::BufferUsage;

#[derive(Debug, Clone, Copy)]
struct StatePair {
    current: CommandBufferState,
    previous: CommandBufferState,
}

/// The part of a command buffer shared with its pool and the device.
///
/// The pool reads buffer states to compute its aggregate state, and the device
/// keeps submitted buffers until their fence signals.
pub(crate) struct CommandBufferShared {
    id: u64,
    handle: CommandBufferHandle,
    states: Mutex<StatePair>,
    pool: Weak<CommandBufferPool>,
    tokens: Mutex<HashMap<ResourceKey, ResourceUsageToken>>,
}

impl CommandBufferShared {
    pub(crate) fn new(id: u64, handle: CommandBufferHandle, pool: Weak<CommandBufferPool>) -> Self {
        Self {
            id,
            handle,
            states: Mutex::new(StatePair {
                current: CommandBufferState::Unallocated,
                previous: CommandBufferState::Unallocated,
            }),
            pool,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn handle(&self) -> CommandBufferHandle {
        self.handle
    }

    pub(crate) fn state(&self) -> CommandBufferState {
        self.states.lock().current
    }

    pub(crate) fn previous_state(&self) -> CommandBufferState {
        self.states.lock().previous
    }

    /// Fail unless the buffer is in one of `allowed`.
    pub(crate) fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[CommandBufferState],
        expected: &'static str,
    ) -> GpuResult<()> {
        let actual = self.state();
        if allowed.contains(&actual) {
            Ok(())
        } else {
            Err(GpuError::InvalidCommandBufferState {
                operation,
                actual,
                expected,
            })
        }
    }

    /// Move to `to` if the buffer is in one of `allowed`, then let the pool
    /// recompute its state. Returns the state left.
    pub(crate) fn transition(
        &self,
        operation: &'static str,
        allowed: &[CommandBufferState],
        expected: &'static str,
        to: CommandBufferState,
    ) -> GpuResult<CommandBufferState> {
        let left = {
            let mut states = self.states.lock();
            if !allowed.contains(&states.current) {
                return Err(GpuError::InvalidCommandBufferState {
                    operation,
                    actual: states.current,
                    expected,
                });
            }
            let left = states.current;
            states.previous = left;
            states.current = to;
            left
        };

        log::trace!("Command buffer {}: {:?} -> {:?}", self.id, left, to);

        if let Some(pool) = self.pool.upgrade() {
            pool.on_buffer_state_changed()?;
        }
        Ok(left)
    }

    /// Set the state without notifying the pool. The pool calls this while
    /// resetting or destroying itself and recomputes afterwards.
    pub(crate) fn set_state_silently(&self, to: CommandBufferState) {
        let mut states = self.states.lock();
        states.previous = states.current;
        states.current = to;
    }

    /// Pin `resource` until this recording's GPU work completes.
    pub(crate) fn track(&self, resource: Arc<dyn RefCountedResource>) -> GpuResult<()> {
        let key = ResourceKey::of(&resource);
        let mut tokens = self.tokens.lock();
        if !tokens.contains_key(&key) {
            tokens.insert(key, ResourceUsageToken::acquire(resource)?);
        }
        Ok(())
    }

    /// Hand the tokens of this recording to whoever waits for its completion.
    pub(crate) fn take_tokens(&self) -> Vec<ResourceUsageToken> {
        self.tokens.lock().drain().map(|(_, token)| token).collect()
    }

    /// Drop the tokens of an unsubmitted recording.
    pub(crate) fn release_tokens(&self) {
        drop(self.take_tokens());
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.tokens.lock().len()
    }
}

impl std::fmt::Debug for CommandBufferShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBufferShared")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Bindings of the current recording.
#[derive(Default)]
struct BindState {
    framebuffer: Option<Arc<Framebuffer>>,
    graphics_pipeline: Option<Arc<Pipeline>>,
    compute_pipeline: Option<Arc<Pipeline>>,
    #[cfg(feature = "validation")]
    index_buffer: Option<(Arc<Buffer>, IndexFormat, u64)>,
    viewports: Vec<Viewport>,
    scissors: Vec<ScissorRect>,
    /// A native rendering scope is open on the bound framebuffer.
    rendering: bool,
}

/// A command buffer allocated from a [`CommandBufferPool`].
///
/// Recording methods take `&mut self`: one buffer is recorded by one thread at
/// a time. Every recording method requires the `Recording` state, and every
/// resource it references is pinned until the GPU finishes the submission.
///
/// Render passes are implicit. Binding a framebuffer and then drawing or
/// clearing opens one; dispatches, copies, layout transitions, a new
/// framebuffer or [`end`](Self::end) close it.
pub struct CommandBuffer {
    shared: Arc<CommandBufferShared>,
    native: Arc<dyn NativeDevice>,
    #[cfg_attr(not(feature = "validation"), allow(dead_code))]
    limits: DeviceLimits,
    can_reset: bool,
    bindings: BindState,
}

impl CommandBuffer {
    pub(crate) fn new(
        shared: Arc<CommandBufferShared>,
        native: Arc<dyn NativeDevice>,
        can_reset: bool,
    ) -> Self {
        let limits = native.limits();
        Self {
            shared,
            native,
            limits,
            can_reset,
            bindings: BindState::default(),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<CommandBufferShared> {
        &self.shared
    }

    pub fn id(&self) -> u64 {
        self.shared.id()
    }

    pub fn handle(&self) -> CommandBufferHandle {
        self.shared.handle()
    }

    pub fn state(&self) -> CommandBufferState {
        self.shared.state()
    }

    /// The state left by the most recent transition.
    pub fn previous_state(&self) -> CommandBufferState {
        self.shared.previous_state()
    }

    /// The pool this buffer was allocated from, if it is still alive.
    pub fn pool(&self) -> Option<Arc<CommandBufferPool>> {
        self.shared.pool.upgrade()
    }

    /// Number of distinct resources pinned by the current recording.
    pub fn tracked_resources(&self) -> usize {
        self.shared.tracked_count()
    }

    // Lifecycle

    /// Start recording.
    ///
    /// # Errors
    ///
    /// [`GpuError::PoolNotUsable`] if the pool sits in a manager or was
    /// disposed, [`GpuError::InvalidCommandBufferState`] unless `Ready`.
    pub fn begin(&mut self, usage: CommandBufferUsage) -> GpuResult<()> {
        self.ensure_pool_usable()?;
        self.shared
            .expect_state("begin", &[CommandBufferState::Ready], "Ready")?;
        self.native.begin_command_buffer(self.shared.handle, usage)?;
        self.shared.release_tokens();
        self.bindings = BindState::default();
        self.shared.transition(
            "begin",
            &[CommandBufferState::Ready],
            "Ready",
            CommandBufferState::Recording,
        )?;
        Ok(())
    }

    /// Finish recording.
    pub fn end(&mut self) -> GpuResult<()> {
        self.ensure_recording("end")?;
        self.end_rendering();
        self.native.end_command_buffer(self.shared.handle)?;
        self.bindings = BindState::default();
        self.shared.transition(
            "end",
            &[CommandBufferState::Recording],
            "Recording",
            CommandBufferState::Recorded,
        )?;
        Ok(())
    }

    /// Return a recorded, submitted or completed buffer to `Ready`.
    ///
    /// Only allowed for buffers of a pool created with `can_reset`. Resetting
    /// a submitted buffer is the caller's promise that the GPU is done with it.
    pub fn reset(&mut self) -> GpuResult<()> {
        if !self.can_reset {
            return Err(GpuError::ResetNotAllowed);
        }
        let allowed = [
            CommandBufferState::Recorded,
            CommandBufferState::Submitted,
            CommandBufferState::Completed,
        ];
        let expected = "Recorded, Submitted or Completed";
        self.shared.expect_state("reset", &allowed, expected)?;
        self.native.reset_command_buffer(self.shared.handle)?;
        self.shared.release_tokens();
        self.bindings = BindState::default();
        self.shared
            .transition("reset", &allowed, expected, CommandBufferState::Ready)?;
        Ok(())
    }

    // Bindings

    /// Bind the framebuffer subsequent draws render into.
    ///
    /// Viewports and scissor rectangles are reset to cover the whole
    /// framebuffer, one per color target.
    pub fn set_framebuffer(&mut self, framebuffer: &Arc<Framebuffer>) -> GpuResult<()> {
        self.ensure_recording("set a framebuffer on")?;
        self.track(framebuffer)?;
        self.end_rendering();

        let extent = framebuffer.extent();
        let count = framebuffer.color_targets().len().max(1);
        self.bindings.viewports = vec![Viewport::full(extent); count];
        self.bindings.scissors = vec![ScissorRect::full(extent); count];
        self.bindings.framebuffer = Some(framebuffer.clone());

        for index in 0..count as u32 {
            self.encode(NativeCommand::SetViewport {
                index,
                viewport: Viewport::full(extent),
            });
            self.encode(NativeCommand::SetScissor {
                index,
                rect: ScissorRect::full(extent),
            });
        }
        Ok(())
    }

    /// Bind a graphics or compute pipeline to its bind point.
    pub fn set_pipeline(&mut self, pipeline: &Arc<Pipeline>) -> GpuResult<()> {
        self.ensure_recording("set a pipeline on")?;
        self.track(pipeline)?;
        self.encode(NativeCommand::BindPipeline {
            kind: pipeline.kind(),
            pipeline: pipeline.handle(),
        });
        match pipeline.kind() {
            PipelineKind::Graphics => self.bindings.graphics_pipeline = Some(pipeline.clone()),
            PipelineKind::Compute => self.bindings.compute_pipeline = Some(pipeline.clone()),
        }
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &Arc<Buffer>, offset: u64) -> GpuResult<()> {
        self.ensure_recording("set a vertex buffer on")?;
        #[cfg(feature = "validation")]
        validation::buffer_usage(buffer, BufferUsage::VERTEX, "vertex buffer binding")?;
        self.track(buffer)?;
        self.encode(NativeCommand::BindVertexBuffer {
            slot,
            buffer: buffer.handle(),
            offset,
        });
        Ok(())
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: &Arc<Buffer>,
        format: IndexFormat,
        offset: u64,
    ) -> GpuResult<()> {
        self.ensure_recording("set an index buffer on")?;
        #[cfg(feature = "validation")]
        validation::buffer_usage(buffer, BufferUsage::INDEX, "index buffer binding")?;
        self.track(buffer)?;
        self.encode(NativeCommand::BindIndexBuffer {
            buffer: buffer.handle(),
            format,
            offset,
        });
        #[cfg(feature = "validation")]
        {
            self.bindings.index_buffer = Some((buffer.clone(), format, offset));
        }
        Ok(())
    }

    /// Bind a resource set for the bound graphics pipeline.
    pub fn set_graphics_resource_set(
        &mut self,
        slot: u32,
        set: &Arc<ResourceSet>,
        dynamic_offsets: &[u32],
    ) -> GpuResult<()> {
        self.set_resource_set(PipelineKind::Graphics, slot, set, dynamic_offsets)
    }

    /// Bind a resource set for the bound compute pipeline.
    pub fn set_compute_resource_set(
        &mut self,
        slot: u32,
        set: &Arc<ResourceSet>,
        dynamic_offsets: &[u32],
    ) -> GpuResult<()> {
        self.set_resource_set(PipelineKind::Compute, slot, set, dynamic_offsets)
    }

    fn set_resource_set(
        &mut self,
        kind: PipelineKind,
        slot: u32,
        set: &Arc<ResourceSet>,
        dynamic_offsets: &[u32],
    ) -> GpuResult<()> {
        self.ensure_recording("set a resource set on")?;
        let pipeline = match kind {
            PipelineKind::Graphics => self.bindings.graphics_pipeline.as_ref(),
            PipelineKind::Compute => self.bindings.compute_pipeline.as_ref(),
        }
        .ok_or_else(|| {
            GpuError::validation(format!("resource set bound without a {kind:?} pipeline"))
        })?;
        let layout = pipeline.layout();

        #[cfg(feature = "validation")]
        validation::dynamic_offsets(pipeline, slot, set, dynamic_offsets, &self.limits)?;

        self.track(set)?;
        self.encode(NativeCommand::BindResourceSet {
            kind,
            layout,
            slot,
            set: set.handle(),
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
        Ok(())
    }

    pub fn set_viewport(&mut self, index: u32, viewport: Viewport) -> GpuResult<()> {
        self.ensure_recording("set a viewport on")?;
        let slot = index as usize;
        if self.bindings.viewports.len() <= slot {
            self.bindings.viewports.resize(slot + 1, Viewport::default());
        }
        self.bindings.viewports[slot] = viewport;
        self.encode(NativeCommand::SetViewport { index, viewport });
        Ok(())
    }

    /// Set every viewport to cover the bound framebuffer.
    pub fn set_full_viewports(&mut self) -> GpuResult<()> {
        self.ensure_recording("set viewports on")?;
        let framebuffer = self.bound_framebuffer("set full viewports")?;
        let viewport = Viewport::full(framebuffer.extent());
        for index in 0..self.bindings.viewports.len() as u32 {
            self.set_viewport(index, viewport)?;
        }
        Ok(())
    }

    pub fn set_scissor_rect(&mut self, index: u32, rect: ScissorRect) -> GpuResult<()> {
        self.ensure_recording("set a scissor rectangle on")?;
        let slot = index as usize;
        if self.bindings.scissors.len() <= slot {
            self.bindings.scissors.resize(slot + 1, ScissorRect::default());
        }
        self.bindings.scissors[slot] = rect;
        self.encode(NativeCommand::SetScissor { index, rect });
        Ok(())
    }

    /// Set every scissor rectangle to cover the bound framebuffer.
    pub fn set_full_scissor_rects(&mut self) -> GpuResult<()> {
        self.ensure_recording("set scissor rectangles on")?;
        let framebuffer = self.bound_framebuffer("set full scissor rectangles")?;
        let rect = ScissorRect::full(framebuffer.extent());
        for index in 0..self.bindings.scissors.len() as u32 {
            self.set_scissor_rect(index, rect)?;
        }
        Ok(())
    }

    // Clears

    pub fn clear_color_target(&mut self, index: u32, color: [f32; 4]) -> GpuResult<()> {
        self.ensure_recording("clear a color target in")?;
        let framebuffer = self.bound_framebuffer("clear a color target")?;
        if index as usize >= framebuffer.color_targets().len() {
            return Err(GpuError::validation(format!(
                "color target {index} out of range, framebuffer has {}",
                framebuffer.color_targets().len()
            )));
        }
        let extent = framebuffer.extent();
        self.begin_rendering()?;
        self.encode(NativeCommand::ClearColor { index, color, extent });
        Ok(())
    }

    pub fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) -> GpuResult<()> {
        self.ensure_recording("clear a depth target in")?;
        let framebuffer = self.bound_framebuffer("clear the depth target")?;
        let target = framebuffer
            .depth_target()
            .ok_or_else(|| GpuError::validation("framebuffer has no depth target"))?;
        let has_stencil = target.format().has_stencil();
        let extent = framebuffer.extent();
        self.begin_rendering()?;
        self.encode(NativeCommand::ClearDepthStencil {
            depth,
            stencil,
            has_stencil,
            extent,
        });
        Ok(())
    }

    // Draws

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> GpuResult<()> {
        self.ensure_recording("draw in")?;
        #[cfg(feature = "validation")]
        self.validate_draw()?;
        self.begin_rendering()?;
        self.encode(NativeCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> GpuResult<()> {
        self.ensure_recording("draw in")?;
        #[cfg(feature = "validation")]
        {
            self.validate_draw()?;
            let (buffer, format, offset) = self.bound_index_buffer()?;
            validation::index_range(buffer, *format, *offset, first_index, index_count)?;
        }
        self.begin_rendering()?;
        self.encode(NativeCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
        Ok(())
    }

    /// Draw with arguments read from `buffer` as [`DrawIndirectArgs`](crate::types::DrawIndirectArgs) records.
    pub fn draw_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> GpuResult<()> {
        self.ensure_recording("draw in")?;
        #[cfg(feature = "validation")]
        {
            validation::indirect(buffer, offset, stride, validation::DRAW_INDIRECT_STRIDE)?;
            self.validate_draw()?;
        }
        self.track(buffer)?;
        self.begin_rendering()?;
        self.encode(NativeCommand::DrawIndirect {
            buffer: buffer.handle(),
            offset,
            draw_count,
            stride,
        });
        Ok(())
    }

    /// Indexed variant of [`draw_indirect`](Self::draw_indirect).
    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> GpuResult<()> {
        self.ensure_recording("draw in")?;
        #[cfg(feature = "validation")]
        {
            validation::indirect(buffer, offset, stride, validation::DRAW_INDEXED_INDIRECT_STRIDE)?;
            self.validate_draw()?;
            self.bound_index_buffer()?;
        }
        self.track(buffer)?;
        self.begin_rendering()?;
        self.encode(NativeCommand::DrawIndexedIndirect {
            buffer: buffer.handle(),
            offset,
            draw_count,
            stride,
        });
        Ok(())
    }

    // Compute

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> GpuResult<()> {
        self.ensure_recording("dispatch in")?;
        #[cfg(feature = "validation")]
        self.validate_dispatch()?;
        self.end_rendering();
        self.encode(NativeCommand::Dispatch { x, y, z });
        Ok(())
    }

    pub fn dispatch_indirect(&mut self, buffer: &Arc<Buffer>, offset: u64) -> GpuResult<()> {
        self.ensure_recording("dispatch in")?;
        #[cfg(feature = "validation")]
        {
            validation::buffer_usage(buffer, BufferUsage::INDIRECT, "indirect dispatch")?;
            if offset % 4 != 0 {
                return Err(GpuError::validation(format!(
                    "indirect offset {offset} is not a multiple of 4"
                )));
            }
            self.validate_dispatch()?;
        }
        self.track(buffer)?;
        self.end_rendering();
        self.encode(NativeCommand::DispatchIndirect {
            buffer: buffer.handle(),
            offset,
        });
        Ok(())
    }

    // Transfers

    pub fn copy_buffer(
        &mut self,
        source: &Arc<Buffer>,
        source_offset: u64,
        destination: &Arc<Buffer>,
        destination_offset: u64,
        size: u64,
    ) -> GpuResult<()> {
        self.ensure_recording("copy in")?;
        #[cfg(feature = "validation")]
        validation::copy_range(source, source_offset, destination, destination_offset, size)?;
        self.track(source)?;
        self.track(destination)?;
        self.end_rendering();
        self.encode(NativeCommand::CopyBuffer {
            source: source.handle(),
            source_offset,
            destination: destination.handle(),
            destination_offset,
            size,
        });
        Ok(())
    }

    /// Record an image layout transition of `texture`.
    pub fn transition_texture(
        &mut self,
        texture: &Arc<Texture>,
        from: TextureLayout,
        to: TextureLayout,
    ) -> GpuResult<()> {
        self.ensure_recording("transition a texture in")?;
        self.track(texture)?;
        self.end_rendering();
        self.encode(NativeCommand::TransitionLayout {
            texture: texture.handle(),
            format: texture.format(),
            from,
            to,
        });
        Ok(())
    }

    // Helpers

    fn ensure_pool_usable(&self) -> GpuResult<()> {
        let state = self
            .shared
            .pool
            .upgrade()
            .map_or(PoolState::Disposed, |pool| pool.state());
        if state.is_usable() {
            Ok(())
        } else {
            Err(GpuError::PoolNotUsable(state))
        }
    }

    fn ensure_recording(&self, operation: &'static str) -> GpuResult<()> {
        self.shared
            .expect_state(operation, &[CommandBufferState::Recording], "Recording")
    }

    fn track<T: RefCountedResource + 'static>(&self, resource: &Arc<T>) -> GpuResult<()> {
        self.shared.track(resource.clone())
    }

    fn encode(&self, command: NativeCommand) {
        self.native.encode(self.shared.handle, &command);
    }

    fn bound_framebuffer(&self, operation: &str) -> GpuResult<Arc<Framebuffer>> {
        self.bindings
            .framebuffer
            .clone()
            .ok_or_else(|| GpuError::validation(format!("cannot {operation} without a bound framebuffer")))
    }

    fn begin_rendering(&mut self) -> GpuResult<()> {
        if self.bindings.rendering {
            return Ok(());
        }
        let framebuffer = self.bound_framebuffer("render")?;
        self.encode(NativeCommand::BeginRendering {
            colors: framebuffer.color_targets().iter().map(|t| t.view()).collect(),
            depth: framebuffer.depth_target().map(|t| t.view()),
            depth_has_stencil: framebuffer
                .depth_target()
                .is_some_and(|t| t.format().has_stencil()),
            extent: framebuffer.extent(),
        });
        self.bindings.rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) {
        if self.bindings.rendering {
            self.encode(NativeCommand::EndRendering);
            self.bindings.rendering = false;
        }
    }

    #[cfg(feature = "validation")]
    fn validate_draw(&self) -> GpuResult<()> {
        validation::draw_targets(
            self.bindings.framebuffer.as_deref(),
            self.bindings.graphics_pipeline.as_deref(),
        )
    }

    #[cfg(feature = "validation")]
    fn validate_dispatch(&self) -> GpuResult<()> {
        if self.bindings.compute_pipeline.is_none() {
            return Err(GpuError::validation("dispatch without a bound compute pipeline"));
        }
        Ok(())
    }

    #[cfg(feature = "validation")]
    fn bound_index_buffer(&self) -> GpuResult<&(Arc<Buffer>, IndexFormat, u64)> {
        self.bindings
            .index_buffer
            .as_ref()
            .ok_or_else(|| GpuError::validation("indexed draw without a bound index buffer"))
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if self.shared.state() == CommandBufferState::Recording {
            log::warn!(
                "Command buffer {} dropped while recording, ending it",
                self.shared.id()
            );
            if let Err(e) = self.end() {
                log::error!("Failed to end dropped command buffer: {e}");
            }
        }
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .field("can_reset", &self.can_reset)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CommandBuffer: Send);
static_assertions::assert_impl_all!(CommandBufferShared: Send, Sync);
