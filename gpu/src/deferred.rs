//! Deferred disposal of GPU resources.
//!
//! Submitted work runs asynchronously, so a resource released by the CPU may
//! still be referenced by commands the GPU has not executed yet. Instead of
//! disposing such a resource right away, it is queued here and disposed at
//! the next point where the device is known to be idle.
//!
//! ```text
//! dispose_when_idle(resource):
//!   1. Don't call dispose()
//!   2. Push the resource onto the pending list
//!
//! wait_for_idle(barrier):
//!   1. Run the barrier (block until no submitted work is outstanding)
//!   2. Take the pending list
//!   3. Dispose every entry, in queue order
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GpuResult;
use crate::resource::RefCountedResource;

/// Resources waiting for the device to become idle before they are disposed.
///
/// Entries are disposed only by [`wait_for_idle`](Self::wait_for_idle), after
/// its barrier confirmed that every previously submitted command finished.
/// Entries queued while a flush is disposing are kept for the next one.
pub struct DeferredDisposalQueue {
    pending: Mutex<Vec<Arc<dyn RefCountedResource>>>,
}

impl DeferredDisposalQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queue `resource` for disposal at the next idle point.
    ///
    /// Never blocks on the GPU.
    pub fn dispose_when_idle(&self, resource: Arc<dyn RefCountedResource>) {
        let mut pending = self.pending.lock();
        pending.push(resource);
        log::trace!("Queued resource for deferred disposal ({} pending)", pending.len());
    }

    /// Number of resources waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wait for idle via `barrier`, then dispose everything queued so far.
    ///
    /// If the barrier fails nothing is disposed and the queue is left intact.
    /// Returns the number of disposed resources.
    pub fn wait_for_idle(&self, barrier: impl FnOnce() -> GpuResult<()>) -> GpuResult<usize> {
        barrier()?;
        Ok(self.flush())
    }

    /// Dispose every queued resource without waiting.
    ///
    /// The caller must know the device is idle.
    pub(crate) fn flush(&self) -> usize {
        let drained = std::mem::take(&mut *self.pending.lock());
        let count = drained.len();
        for resource in drained {
            resource.dispose();
        }
        if count > 0 {
            log::debug!("Disposed {count} deferred resource(s)");
        }
        count
    }
}

impl Default for DeferredDisposalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredDisposalQueue {
    fn drop(&mut self) {
        let remaining = self.pending.get_mut().len();
        if remaining > 0 {
            log::warn!("Deferred disposal queue dropped with {remaining} pending resource(s)");
        }
    }
}

impl std::fmt::Debug for DeferredDisposalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredDisposalQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(DeferredDisposalQueue: Send, Sync);
