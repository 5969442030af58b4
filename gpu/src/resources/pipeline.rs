//! Imported pipelines and resource sets.
//!
//! Shader compilation and descriptor validation happen outside this crate.
//! Their results are imported with enough metadata for command validation.

use std::sync::Arc;

use crate::backend::{NativeDevice, PipelineHandle, PipelineLayoutHandle, ResourceSetHandle};
use crate::resource::{Destroyable, RefCount, RefCountedResource};
use crate::types::{OutputDescription, PipelineDescriptor, PipelineKind, ResourceLayoutDescriptor};

/// A compiled graphics or compute pipeline.
pub struct Pipeline {
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: PipelineHandle,
    layout: PipelineLayoutHandle,
    descriptor: PipelineDescriptor,
}

impl Pipeline {
    pub(crate) fn new(
        native: Arc<dyn NativeDevice>,
        handle: PipelineHandle,
        layout: PipelineLayoutHandle,
        descriptor: PipelineDescriptor,
    ) -> Self {
        Self {
            ref_count: RefCount::new(),
            native,
            handle,
            layout,
            descriptor,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle
    }

    pub fn layout(&self) -> PipelineLayoutHandle {
        self.layout
    }

    pub fn kind(&self) -> PipelineKind {
        self.descriptor.kind
    }

    pub fn is_compute(&self) -> bool {
        self.descriptor.kind == PipelineKind::Compute
    }

    /// Attachment formats a graphics pipeline renders into.
    pub fn outputs(&self) -> Option<&OutputDescription> {
        self.descriptor.outputs.as_ref()
    }

    pub fn resource_layouts(&self) -> &[ResourceLayoutDescriptor] {
        &self.descriptor.resource_layouts
    }
}

impl Destroyable for Pipeline {
    fn destroy(&self) {
        self.native.destroy_pipeline(self.handle);
    }
}

impl RefCountedResource for Pipeline {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handle", &self.handle)
            .field("kind", &self.descriptor.kind)
            .field("label", &self.descriptor.label)
            .finish_non_exhaustive()
    }
}

/// A bound group of shader resources.
pub struct ResourceSet {
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: ResourceSetHandle,
    layout: ResourceLayoutDescriptor,
    label: Option<String>,
}

impl ResourceSet {
    pub(crate) fn new(
        native: Arc<dyn NativeDevice>,
        handle: ResourceSetHandle,
        layout: ResourceLayoutDescriptor,
        label: Option<String>,
    ) -> Self {
        Self {
            ref_count: RefCount::new(),
            native,
            handle,
            layout,
            label,
        }
    }

    pub fn handle(&self) -> ResourceSetHandle {
        self.handle
    }

    pub fn layout(&self) -> &ResourceLayoutDescriptor {
        &self.layout
    }
}

impl Destroyable for ResourceSet {
    fn destroy(&self) {
        self.native.free_resource_set(self.handle);
    }
}

impl RefCountedResource for ResourceSet {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl std::fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSet")
            .field("handle", &self.handle)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
