//! Reference-counted lifetime of GPU-backed objects.
//!
//! Every object that owns native GPU handles carries a [`RefCount`]. The count
//! starts at one when the object is created. Additional holders call
//! [`RefCountedResource::add_reference`] and give their hold back with
//! [`RefCountedResource::release_reference`]. The object's
//! [`Destroyable::destroy`] runs exactly once, on whichever thread observes
//! the count reach zero.
//!
//! Memory of the Rust object itself is managed by `Arc`; the count governs
//! when the *native* handles are released, which must be deterministic and
//! must not happen while the GPU can still touch them.
//!
//! ```text
//!   create ──► count = 1
//!   add_reference ──► count + 1          (validation: fails once count hit 0)
//!   release_reference ──► count - 1 ──► 0? ──► destroy() (once)
//!   force_destroy ──► release until count <= 0
//! ```

mod token;

pub use token::{ResourceKey, ResourceUsageToken};

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

#[cfg(feature = "validation")]
use crate::error::GpuError;
use crate::error::GpuResult;

/// Atomic reference count with a one-shot destroy guard.
#[derive(Debug)]
pub struct RefCount {
    count: AtomicI32,
    destroyed: AtomicBool,
}

impl RefCount {
    /// Create a count holding the creator's reference.
    pub fn new() -> Self {
        Self {
            count: AtomicI32::new(1),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Current number of references.
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    /// Whether the destroy action already ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Increment the count and return the new value.
    pub fn increment(&self, label: Option<&str>) -> GpuResult<i32> {
        #[cfg(feature = "validation")]
        {
            let mut current = self.count.load(Ordering::Acquire);
            loop {
                if current <= 0 {
                    return Err(GpuError::UseAfterDestroy(
                        label.unwrap_or("<unnamed>").to_string(),
                    ));
                }
                match self.count.compare_exchange_weak(
                    current,
                    current + 1,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return Ok(current + 1),
                    Err(actual) => current = actual,
                }
            }
        }

        #[cfg(not(feature = "validation"))]
        {
            let _ = label;
            Ok(self.count.fetch_add(1, Ordering::AcqRel) + 1)
        }
    }

    /// Decrement the count, running `destroy` if this call brought it to zero.
    ///
    /// The count saturates at zero. Returns the new value.
    pub fn decrement(&self, destroy: impl FnOnce()) -> i32 {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > 0).then_some(count - 1)
            });

        match previous {
            Ok(previous) => {
                let remaining = previous - 1;
                if remaining == 0
                    && self
                        .destroyed
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                {
                    destroy();
                }
                remaining
            }
            Err(_) => {
                log::warn!("Released a reference on an already destroyed resource");
                0
            }
        }
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability of releasing the native handles an object owns.
///
/// Called at most once per object, by its [`RefCount`].
pub trait Destroyable {
    fn destroy(&self);
}

/// A GPU-backed object with explicit shared ownership.
pub trait RefCountedResource: Destroyable + Send + Sync {
    /// The object's reference count.
    fn ref_count(&self) -> &RefCount;

    /// Debug label used in lifetime errors.
    fn label(&self) -> Option<&str> {
        None
    }

    /// Take an additional reference. Returns the new count.
    ///
    /// # Errors
    ///
    /// With the `validation` feature, returns [`GpuError::UseAfterDestroy`]
    /// if the count already reached zero.
    fn add_reference(&self) -> GpuResult<i32> {
        self.ref_count().increment(self.label())
    }

    /// Give back one reference, destroying the object when none remain.
    fn release_reference(&self) -> i32 {
        self.ref_count().decrement(|| self.destroy())
    }

    /// Release the creator's reference.
    fn dispose(&self) {
        self.release_reference();
    }

    /// Release references until the object is destroyed, regardless of
    /// outstanding holders. Intended for top-level teardown.
    fn force_destroy(&self) {
        while self.ref_count().count() > 0 {
            self.release_reference();
        }
    }

    fn is_destroyed(&self) -> bool {
        self.ref_count().is_destroyed()
    }
}
