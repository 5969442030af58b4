//! Usage tokens pinning resources for pending GPU work.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::RefCountedResource;
use crate::error::GpuResult;

/// Identity of a resource, independent of its contents.
///
/// Two keys are equal exactly when they refer to the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(usize);

impl ResourceKey {
    pub fn of<T: ?Sized>(resource: &Arc<T>) -> Self {
        Self(Arc::as_ptr(resource) as *const () as usize)
    }
}

/// Holds a resource alive while GPU work that references it is pending.
///
/// Acquiring a token takes one reference on the target. Each additional
/// pending use takes another, and [`complete_use`](Self::complete_use) gives
/// one back. Dropping the token gives back every use still pending, so a
/// token must be kept until the GPU work it guards is known complete.
pub struct ResourceUsageToken {
    target: Arc<dyn RefCountedResource>,
    pending: u32,
}

impl ResourceUsageToken {
    /// Pin `target` for one pending use.
    pub fn acquire(target: Arc<dyn RefCountedResource>) -> GpuResult<Self> {
        target.add_reference()?;
        Ok(Self { target, pending: 1 })
    }

    /// Record one more pending use of the target.
    pub fn add_use(&mut self) -> GpuResult<u32> {
        self.target.add_reference()?;
        self.pending += 1;
        Ok(self.pending)
    }

    /// Mark one pending use as finished. Returns the remaining uses.
    pub fn complete_use(&mut self) -> u32 {
        if self.pending > 0 {
            self.pending -= 1;
            self.target.release_reference();
        }
        self.pending
    }

    pub fn pending_uses(&self) -> u32 {
        self.pending
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::of(&self.target)
    }

    pub fn target(&self) -> &Arc<dyn RefCountedResource> {
        &self.target
    }
}

impl Drop for ResourceUsageToken {
    fn drop(&mut self) {
        while self.pending > 0 {
            self.complete_use();
        }
    }
}

impl PartialEq for ResourceUsageToken {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.target), Arc::as_ptr(&other.target))
    }
}

impl Eq for ResourceUsageToken {}

impl Hash for ResourceUsageToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Debug for ResourceUsageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceUsageToken")
            .field("target", &self.target.label())
            .field("pending", &self.pending)
            .finish()
    }
}
