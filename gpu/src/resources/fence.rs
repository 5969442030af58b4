//! CPU-GPU synchronization fence.

use std::sync::Arc;

use crate::backend::{FenceHandle, NativeDevice};
use crate::error::GpuResult;
use crate::resource::{Destroyable, RefCount, RefCountedResource};

/// Sentinel timeout meaning "wait until signaled".
pub const WAIT_FOREVER: u64 = u64::MAX;

/// A fence the GPU signals once submitted work has completed.
///
/// Waiting goes through
/// [`GraphicsDevice::wait_for_fence`](crate::GraphicsDevice::wait_for_fence)
/// so completion is also reflected in command buffer states.
pub struct Fence {
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: FenceHandle,
}

impl Fence {
    pub(crate) fn new(native: Arc<dyn NativeDevice>, signaled: bool) -> GpuResult<Self> {
        let handle = native.create_fence(signaled)?;
        Ok(Self {
            ref_count: RefCount::new(),
            native,
            handle,
        })
    }

    pub fn handle(&self) -> FenceHandle {
        self.handle
    }

    /// Non-blocking status query.
    pub fn signaled(&self) -> GpuResult<bool> {
        self.native.fence_signaled(self.handle)
    }
}

impl Destroyable for Fence {
    fn destroy(&self) {
        self.native.destroy_fence(self.handle);
    }
}

impl RefCountedResource for Fence {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
