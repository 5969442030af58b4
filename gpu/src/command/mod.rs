//! Command recording: buffers, pools and the pool manager.
//!
//! # State machines
//!
//! ```text
//! CommandBuffer:
//!   Unallocated ──► Ready ──begin──► Recording ──end──► Recorded
//!                     ▲                                    │ submit
//!                     │ reset (can-reset pools)            ▼
//!                     └──────────── Completed ◄──refresh── Submitted
//!
//! CommandBufferPool (aggregate of its buffers):
//!   InPool ──rent──► Ready ──buffer active──► InUse ──all done──► Completed
//!     ▲                │ ▲                                          │
//!     └──── return ────┘ └────────────── reset ─────────────────────┘
//! ```
//!
//! Every buffer state change is reported to the owning pool, which recomputes
//! its aggregate state. A pool reaching `Completed` is reported to the
//! [`PoolObserver`] it was created with (the manager).

mod buffer;
mod manager;
mod pool;
#[cfg(feature = "validation")]
mod validation;

pub use buffer::CommandBuffer;
pub use manager::CommandBufferPoolManager;
pub use pool::{CommandBufferPool, CommandBufferPoolDescriptor, PoolObserver};

pub(crate) use buffer::CommandBufferShared;

/// Lifecycle state of a [`CommandBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferState {
    /// Native backing not allocated yet.
    Unallocated,
    /// Allocated and reset; recording may begin.
    Ready,
    /// Between `begin` and `end`.
    Recording,
    /// Recording finished; may be submitted.
    Recorded,
    /// Handed to the GPU; completion not observed yet.
    Submitted,
    /// The GPU finished executing it.
    Completed,
    /// The owning pool was destroyed.
    Disposed,
}

impl CommandBufferState {
    /// Whether a buffer in this state keeps its pool `InUse`.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Recorded | Self::Submitted)
    }
}

/// Aggregate state of a [`CommandBufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Held by a manager; not usable.
    InPool,
    /// No buffer in flight; usable.
    Ready,
    /// At least one buffer is recording, recorded or submitted.
    InUse,
    /// Every previously active buffer completed; awaiting reset.
    Completed,
    /// Native pool destroyed.
    Disposed,
}

impl PoolState {
    /// Whether buffers may be allocated and recorded.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::InUse | Self::Completed)
    }
}
