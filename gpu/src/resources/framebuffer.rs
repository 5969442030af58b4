//! Framebuffers: a set of color targets plus an optional depth target.

use std::sync::Arc;

use crate::error::{GpuError, GpuResult};
use crate::resource::{Destroyable, RefCount, RefCountedResource};
use crate::resources::Texture;
use crate::types::{Extent2d, OutputDescription};

/// Attachments rendered into by draw calls.
///
/// A framebuffer holds one reference on each of its targets for as long as
/// it lives, so a depth target can be shared by several framebuffers.
pub struct Framebuffer {
    ref_count: RefCount,
    color_targets: Vec<Arc<Texture>>,
    depth_target: Option<Arc<Texture>>,
    extent: Extent2d,
    outputs: OutputDescription,
}

impl Framebuffer {
    /// Build a framebuffer over existing targets.
    ///
    /// # Errors
    ///
    /// Fails if there are no attachments, if the attachment extents differ,
    /// if the depth target does not have a depth format, or if a target was
    /// already destroyed.
    pub fn new(
        color_targets: Vec<Arc<Texture>>,
        depth_target: Option<Arc<Texture>>,
    ) -> GpuResult<Self> {
        let extent = match (color_targets.first(), depth_target.as_ref()) {
            (Some(color), _) => color.extent(),
            (None, Some(depth)) => depth.extent(),
            (None, None) => {
                return Err(GpuError::validation("framebuffer has no attachments"));
            }
        };

        if let Some(mismatch) = color_targets
            .iter()
            .chain(depth_target.iter())
            .find(|target| target.extent() != extent)
        {
            return Err(GpuError::validation(format!(
                "framebuffer attachment extent {:?} differs from {:?}",
                mismatch.extent(),
                extent
            )));
        }

        if let Some(depth) = &depth_target
            && !depth.format().is_depth()
        {
            return Err(GpuError::validation(format!(
                "depth target format {:?} is not a depth format",
                depth.format()
            )));
        }

        let mut referenced: Vec<&Arc<Texture>> = Vec::new();
        for target in color_targets.iter().chain(depth_target.iter()) {
            if let Err(e) = target.add_reference() {
                for taken in referenced {
                    taken.release_reference();
                }
                return Err(e);
            }
            referenced.push(target);
        }

        let outputs = OutputDescription {
            color_formats: color_targets.iter().map(|target| target.format()).collect(),
            depth_format: depth_target.as_ref().map(|depth| depth.format()),
            sample_count: color_targets
                .first()
                .or(depth_target.as_ref())
                .map_or(1, |target| target.descriptor().sample_count),
        };

        Ok(Self {
            ref_count: RefCount::new(),
            color_targets,
            depth_target,
            extent,
            outputs,
        })
    }

    pub fn color_targets(&self) -> &[Arc<Texture>] {
        &self.color_targets
    }

    pub fn depth_target(&self) -> Option<&Arc<Texture>> {
        self.depth_target.as_ref()
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn outputs(&self) -> &OutputDescription {
        &self.outputs
    }
}

impl Destroyable for Framebuffer {
    fn destroy(&self) {
        for target in self.color_targets.iter().chain(self.depth_target.iter()) {
            target.release_reference();
        }
    }
}

impl RefCountedResource for Framebuffer {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("extent", &self.extent)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Framebuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDevice, NativeDevice};
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    fn texture(native: &Arc<DummyDevice>, w: u32, h: u32, format: TextureFormat) -> Arc<Texture> {
        let usage = if format.is_depth() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::RENDER_TARGET
        };
        let native: Arc<dyn NativeDevice> = native.clone();
        Arc::new(Texture::new(native, TextureDescriptor::new_2d(w, h, format, usage)).unwrap())
    }

    #[test]
    fn test_framebuffer_outputs() {
        let dummy = Arc::new(DummyDevice::new());
        let color = texture(&dummy, 320, 240, TextureFormat::Rgba8Unorm);
        let depth = texture(&dummy, 320, 240, TextureFormat::Depth32Float);

        let framebuffer = Framebuffer::new(vec![color.clone()], Some(depth.clone())).unwrap();
        assert_eq!(framebuffer.extent(), Extent2d::new(320, 240));
        assert_eq!(framebuffer.outputs().color_formats, vec![TextureFormat::Rgba8Unorm]);
        assert_eq!(framebuffer.outputs().depth_format, Some(TextureFormat::Depth32Float));
        assert_eq!(color.ref_count().count(), 2);
        assert_eq!(depth.ref_count().count(), 2);
    }

    #[test]
    fn test_framebuffer_keeps_targets_alive() {
        let dummy = Arc::new(DummyDevice::new());
        let color = texture(&dummy, 64, 64, TextureFormat::Rgba8Unorm);
        let framebuffer = Framebuffer::new(vec![color.clone()], None).unwrap();

        color.dispose();
        assert!(!color.is_destroyed());
        assert_eq!(dummy.live_textures(), 1);

        framebuffer.dispose();
        assert!(color.is_destroyed());
        assert_eq!(dummy.live_textures(), 0);
    }

    #[test]
    fn test_framebuffer_rejects_mismatched_extents() {
        let dummy = Arc::new(DummyDevice::new());
        let color = texture(&dummy, 64, 64, TextureFormat::Rgba8Unorm);
        let depth = texture(&dummy, 32, 32, TextureFormat::Depth32Float);

        let result = Framebuffer::new(vec![color.clone()], Some(depth));
        assert!(matches!(result, Err(GpuError::Validation(_))));
        assert_eq!(color.ref_count().count(), 1);
    }

    #[test]
    fn test_framebuffer_requires_attachments() {
        assert!(Framebuffer::new(Vec::new(), None).is_err());
    }
}
