//! GPU control-plane error types.

use thiserror::Error;

use crate::command::{CommandBufferState, PoolState};

/// Errors raised by resource lifetime, command recording and pool management.
///
/// Every variant surfaces to the immediate caller. Nothing is retried
/// internally: native failures are fatal to the operation that hit them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// A command buffer operation was attempted in the wrong state.
    #[error("cannot {operation} a command buffer in state {actual:?} (expected {expected})")]
    InvalidCommandBufferState {
        operation: &'static str,
        actual: CommandBufferState,
        expected: &'static str,
    },
    /// The owning pool cannot currently be used for recording.
    #[error("command buffer pool is {0:?} and cannot be used")]
    PoolNotUsable(PoolState),
    /// Command buffers of this pool cannot be reset individually.
    #[error("command buffer pool was not created with the can-reset flag")]
    ResetNotAllowed,
    /// A pool reset was requested while one of its buffers is recording.
    #[error("cannot reset a command buffer pool while a command buffer is recording")]
    PoolBusy,
    /// A pool was returned to its manager in a state other than `Ready`.
    #[error("cannot return command buffer pool in state {0:?}, it must be Ready")]
    PoolNotReady(PoolState),
    /// The pool is not rented from this manager.
    #[error("command buffer pool {0} is not rented from this manager")]
    PoolNotRented(u64),
    /// The manager was torn down while pools were still rented.
    #[error("{0} command buffer pool(s) still in use")]
    PoolsStillInUse(usize),
    /// A reference was taken on a resource whose count already reached zero.
    #[error("resource {0:?} was referenced after it was destroyed")]
    UseAfterDestroy(String),
    /// A recording or draw call violated the command contract.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The requested swap image index does not exist.
    #[error("swap image index {index} out of range ({count} images)")]
    ImageIndexOutOfRange { index: u32, count: usize },
    /// Failed to create a native resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// Any other native API failure.
    #[error("native API call failed: {0}")]
    Native(String),
}

/// Result alias used throughout the crate.
pub type GpuResult<T> = Result<T, GpuError>;

impl GpuError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GpuError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GpuError::PoolNotReady(PoolState::InUse);
        assert_eq!(
            err.to_string(),
            "cannot return command buffer pool in state InUse, it must be Ready"
        );

        let err = GpuError::InvalidCommandBufferState {
            operation: "end",
            actual: CommandBufferState::Ready,
            expected: "Recording",
        };
        assert_eq!(
            err.to_string(),
            "cannot end a command buffer in state Ready (expected Recording)"
        );
    }
}
