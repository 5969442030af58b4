//! Command buffer pools.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::buffer::{CommandBuffer, CommandBufferShared};
use super::{CommandBufferState, PoolState};
use crate::backend::{CommandPoolHandle, NativeDevice, NativePoolInfo};
use crate::error::{GpuError, GpuResult};
use crate::resource::{Destroyable, RefCount, RefCountedResource};

/// Descriptor for creating a command buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CommandBufferPoolDescriptor {
    pub label: Option<String>,
    /// Buffers are re-recorded every frame.
    pub transient: bool,
    /// Buffers may be reset individually with [`CommandBuffer::reset`].
    pub can_reset: bool,
}

impl CommandBufferPoolDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn resettable(mut self) -> Self {
        self.can_reset = true;
        self
    }
}

/// Receives pool completion notifications.
///
/// Called on the thread that observed the last buffer complete, with no pool
/// lock held.
pub trait PoolObserver: Send + Sync {
    fn on_pool_completed(&self, pool: &Arc<CommandBufferPool>) -> GpuResult<()>;
}

/// A native command pool and the buffers allocated from it.
///
/// The pool state is derived from its buffers: `InUse` while any buffer is
/// recording, recorded or submitted, `Completed` once they all finished, and
/// `Ready` otherwise. `InPool` and `Disposed` are set from outside and are not
/// overridden by buffer changes.
pub struct CommandBufferPool {
    id: u64,
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: CommandPoolHandle,
    descriptor: CommandBufferPoolDescriptor,
    state: Mutex<PoolState>,
    buffers: Mutex<Vec<Arc<CommandBufferShared>>>,
    next_buffer_id: AtomicU64,
    observer: Option<Weak<dyn PoolObserver>>,
    return_pending: AtomicBool,
    weak_self: Weak<CommandBufferPool>,
}

impl CommandBufferPool {
    pub(crate) fn new(
        native: Arc<dyn NativeDevice>,
        id: u64,
        descriptor: CommandBufferPoolDescriptor,
        observer: Option<Weak<dyn PoolObserver>>,
        initial_state: PoolState,
    ) -> GpuResult<Arc<Self>> {
        let handle = native.create_command_pool(NativePoolInfo {
            transient: descriptor.transient,
            can_reset: descriptor.can_reset,
        })?;

        log::debug!(
            "Created command buffer pool {} ({})",
            id,
            descriptor.label.as_deref().unwrap_or("unlabeled")
        );

        Ok(Arc::new_cyclic(|weak_self| Self {
            id,
            ref_count: RefCount::new(),
            native,
            handle,
            descriptor,
            state: Mutex::new(initial_state),
            buffers: Mutex::new(Vec::new()),
            next_buffer_id: AtomicU64::new(1),
            observer,
            return_pending: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        }))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> CommandPoolHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &CommandBufferPoolDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> PoolState {
        *self.state.lock()
    }

    pub fn can_reset(&self) -> bool {
        self.descriptor.can_reset
    }

    /// Number of buffers allocated from this pool.
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Allocate a command buffer in the `Ready` state.
    ///
    /// A `Ready` buffer whose [`CommandBuffer`] was dropped and which is not in
    /// flight is handed out again before a new native buffer is allocated.
    ///
    /// # Errors
    ///
    /// [`GpuError::PoolNotUsable`] while the pool sits in a manager or after it
    /// was disposed.
    pub fn allocate_command_buffer(&self) -> GpuResult<CommandBuffer> {
        let state = self.state();
        if !state.is_usable() {
            return Err(GpuError::PoolNotUsable(state));
        }

        // Only the pool holds an unowned, idle buffer.
        let recycled = self
            .buffers
            .lock()
            .iter()
            .find(|buffer| {
                Arc::strong_count(buffer) == 1 && buffer.state() == CommandBufferState::Ready
            })
            .cloned();
        if let Some(shared) = recycled {
            log::trace!("Pool {} recycled command buffer {}", self.id, shared.id());
            return Ok(CommandBuffer::new(
                shared,
                self.native.clone(),
                self.descriptor.can_reset,
            ));
        }

        let handle = self.native.allocate_command_buffer(self.handle)?;
        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(CommandBufferShared::new(id, handle, self.weak_self.clone()));
        self.buffers.lock().push(shared.clone());

        shared.transition(
            "allocate",
            &[CommandBufferState::Unallocated],
            "Unallocated",
            CommandBufferState::Ready,
        )?;

        Ok(CommandBuffer::new(shared, self.native.clone(), self.descriptor.can_reset))
    }

    /// Reset every buffer of the pool to `Ready`.
    ///
    /// # Errors
    ///
    /// [`GpuError::PoolBusy`] if a buffer is recording.
    pub fn reset(&self, release_resources: bool) -> GpuResult<()> {
        {
            let buffers = self.buffers.lock();
            if buffers
                .iter()
                .any(|buffer| buffer.state() == CommandBufferState::Recording)
            {
                return Err(GpuError::PoolBusy);
            }

            self.native.reset_command_pool(self.handle, release_resources)?;

            for buffer in buffers.iter() {
                buffer.release_tokens();
                buffer.set_state_silently(CommandBufferState::Ready);
            }
        }

        log::trace!("Reset command buffer pool {}", self.id);
        self.on_buffer_state_changed()
    }

    /// Recompute the aggregate state after a buffer transition.
    ///
    /// Notifies the observer when the pool enters `Completed`.
    pub(crate) fn on_buffer_state_changed(&self) -> GpuResult<()> {
        let entered_completed = {
            let mut state = self.state.lock();
            if !state.is_usable() {
                return Ok(());
            }

            let (active, completed) = {
                let buffers = self.buffers.lock();
                buffers.iter().fold((0, 0), |(active, completed), buffer| {
                    match buffer.state() {
                        s if s.is_active() => (active + 1, completed),
                        CommandBufferState::Completed => (active, completed + 1),
                        _ => (active, completed),
                    }
                })
            };

            let next = if active > 0 {
                PoolState::InUse
            } else if completed > 0 {
                PoolState::Completed
            } else {
                PoolState::Ready
            };

            let entered = *state != PoolState::Completed && next == PoolState::Completed;
            if *state != next {
                log::trace!("Command buffer pool {}: {:?} -> {:?}", self.id, *state, next);
                *state = next;
            }
            entered
        };

        if entered_completed
            && let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade)
            && let Some(this) = self.weak_self.upgrade()
        {
            observer.on_pool_completed(&this)?;
        }
        Ok(())
    }

    /// Force a state set by the manager.
    pub(crate) fn set_state(&self, state: PoolState) {
        *self.state.lock() = state;
    }

    pub(crate) fn set_return_pending(&self, pending: bool) {
        self.return_pending.store(pending, Ordering::Release);
    }

    pub(crate) fn is_return_pending(&self) -> bool {
        self.return_pending.load(Ordering::Acquire)
    }
}

impl Destroyable for CommandBufferPool {
    fn destroy(&self) {
        *self.state.lock() = PoolState::Disposed;
        for buffer in self.buffers.lock().drain(..) {
            buffer.release_tokens();
            buffer.set_state_silently(CommandBufferState::Disposed);
        }
        self.native.destroy_command_pool(self.handle);
        log::debug!("Destroyed command buffer pool {}", self.id);
    }
}

impl RefCountedResource for CommandBufferPool {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for CommandBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBufferPool")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("buffers", &self.buffer_count())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CommandBufferPool: Send, Sync);
