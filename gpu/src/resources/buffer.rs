//! GPU buffer resource.

use std::sync::Arc;

use crate::backend::{BufferHandle, NativeDevice};
use crate::error::GpuResult;
use crate::resource::{Destroyable, RefCount, RefCountedResource};
use crate::types::{BufferDescriptor, BufferUsage};

/// A GPU buffer.
///
/// Created by [`GraphicsDevice::create_buffer`](crate::GraphicsDevice::create_buffer).
pub struct Buffer {
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: BufferHandle,
    descriptor: BufferDescriptor,
}

impl Buffer {
    pub(crate) fn new(
        native: Arc<dyn NativeDevice>,
        descriptor: BufferDescriptor,
    ) -> GpuResult<Self> {
        let handle = native.create_buffer(&descriptor)?;
        Ok(Self {
            ref_count: RefCount::new(),
            native,
            handle,
            descriptor,
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }
}

impl Destroyable for Buffer {
    fn destroy(&self) {
        log::trace!("Destroying buffer {:?}", self.descriptor.label);
        self.native.destroy_buffer(self.handle);
    }
}

impl RefCountedResource for Buffer {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);
