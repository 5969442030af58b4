//! Per-swap-image render targets.
//!
//! A presentation surface owns a rotating set of images. Rendering into them
//! needs one color target and one framebuffer per image, plus an optional
//! depth target shared by every framebuffer. [`SwapImageTargetSet`] rebuilds
//! that set whenever the surface is (re)created or resized.
//!
//! # Example
//!
//! ```ignore
//! let mut targets = SwapImageTargetSet::new(
//!     device.clone(),
//!     SwapImageTargetDescriptor::default().with_depth_format(TextureFormat::Depth32Float),
//! );
//! targets.set_new_swapchain(swapchain, Extent2d::new(1920, 1080), TextureFormat::Bgra8UnormSrgb)?;
//!
//! // Per frame, after acquiring image `index`:
//! targets.set_image_index(index)?;
//! targets.transition_to_render(&mut cb)?;
//! cb.set_framebuffer(targets.current_framebuffer().unwrap())?;
//! // ... draw ...
//! targets.transition_to_present(&mut cb)?;
//! ```

use std::sync::Arc;

use crate::backend::SwapchainHandle;
use crate::command::CommandBuffer;
use crate::device::GraphicsDevice;
use crate::error::{GpuError, GpuResult};
use crate::resource::RefCountedResource;
use crate::resources::{Framebuffer, Texture};
use crate::types::{
    Extent2d, OutputDescription, TextureDescriptor, TextureFormat, TextureLayout, TextureUsage,
};

/// Configuration of a [`SwapImageTargetSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwapImageTargetDescriptor {
    pub label: Option<String>,
    /// Format of the shared depth target; `None` renders without depth.
    pub depth_format: Option<TextureFormat>,
}

impl SwapImageTargetDescriptor {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }
}

/// One color target and framebuffer per swap image, sharing a depth target.
///
/// There are always exactly as many color targets and framebuffers as the
/// swapchain reported images. Read accessors are relative to the image index
/// set by the acquire step.
pub struct SwapImageTargetSet {
    device: Arc<GraphicsDevice>,
    descriptor: SwapImageTargetDescriptor,
    extent: Extent2d,
    color_format: TextureFormat,
    color_targets: Vec<Arc<Texture>>,
    framebuffers: Vec<Arc<Framebuffer>>,
    layouts: Vec<TextureLayout>,
    depth_target: Option<Arc<Texture>>,
    outputs: Option<OutputDescription>,
    image_index: u32,
}

impl SwapImageTargetSet {
    /// Create an empty set. Targets exist after the first
    /// [`set_new_swapchain`](Self::set_new_swapchain).
    pub fn new(device: Arc<GraphicsDevice>, descriptor: SwapImageTargetDescriptor) -> Self {
        Self {
            device,
            descriptor,
            extent: Extent2d::default(),
            color_format: TextureFormat::default(),
            color_targets: Vec::new(),
            framebuffers: Vec::new(),
            layouts: Vec::new(),
            depth_target: None,
            outputs: None,
            image_index: 0,
        }
    }

    /// Rebuild every target for a new or resized swapchain.
    ///
    /// Waits for the device to go idle, disposes the previous framebuffers
    /// and depth target, recreates the depth target at `extent`, and wraps
    /// each image of `swapchain` in a color target and framebuffer. The image
    /// index is reset to 0.
    ///
    /// The new targets are built before the previous ones are released. On
    /// error the partial targets are disposed and the set keeps its previous
    /// targets, extent and format.
    pub fn set_new_swapchain(
        &mut self,
        swapchain: SwapchainHandle,
        extent: Extent2d,
        color_format: TextureFormat,
    ) -> GpuResult<()> {
        if !self.framebuffers.is_empty() || self.depth_target.is_some() {
            self.device.wait_for_idle()?;
        }

        let mut built = BuiltTargets::default();
        if let Err(e) = self.build_targets(&mut built, swapchain, extent, color_format) {
            log::warn!(
                "Failed to rebuild swap image targets {}: {e}",
                self.descriptor.label.as_deref().unwrap_or("unlabeled")
            );
            built.dispose();
            return Err(e);
        }

        self.release_targets(|resource| resource.dispose());
        self.extent = extent;
        self.color_format = color_format;
        self.image_index = 0;
        self.layouts = vec![TextureLayout::Undefined; built.color_targets.len()];
        self.color_targets = built.color_targets;
        self.framebuffers = built.framebuffers;
        self.depth_target = built.depth_target;

        self.outputs = self
            .framebuffers
            .first()
            .map(|framebuffer| framebuffer.outputs().clone());

        log::info!(
            "Rebuilt swap image targets {}: {} image(s) at {}x{}, {:?}, depth {:?}",
            self.descriptor.label.as_deref().unwrap_or("unlabeled"),
            self.framebuffers.len(),
            extent.width,
            extent.height,
            color_format,
            self.descriptor.depth_format
        );
        Ok(())
    }

    /// Select the current image, as reported by swap image acquisition.
    pub fn set_image_index(&mut self, index: u32) -> GpuResult<()> {
        if index as usize >= self.framebuffers.len() {
            return Err(GpuError::ImageIndexOutOfRange {
                index,
                count: self.framebuffers.len(),
            });
        }
        self.image_index = index;
        Ok(())
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn image_count(&self) -> usize {
        self.color_targets.len()
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    pub fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    /// Color targets, indexed by swap image.
    pub fn color_targets(&self) -> &[Arc<Texture>] {
        &self.color_targets
    }

    pub fn framebuffers(&self) -> &[Arc<Framebuffer>] {
        &self.framebuffers
    }

    pub fn depth_target(&self) -> Option<&Arc<Texture>> {
        self.depth_target.as_ref()
    }

    pub fn current_color_target(&self) -> Option<&Arc<Texture>> {
        self.color_targets.get(self.image_index as usize)
    }

    pub fn current_framebuffer(&self) -> Option<&Arc<Framebuffer>> {
        self.framebuffers.get(self.image_index as usize)
    }

    /// Attachment formats of the framebuffers, for building compatible
    /// pipelines.
    pub fn outputs(&self) -> Option<&OutputDescription> {
        self.outputs.as_ref()
    }

    /// Record the transition of the current image to a color attachment.
    pub fn transition_to_render(&mut self, command_buffer: &mut CommandBuffer) -> GpuResult<()> {
        self.transition_current(command_buffer, TextureLayout::ColorAttachment)
    }

    /// Record the transition of the current image to a presentable layout.
    pub fn transition_to_present(&mut self, command_buffer: &mut CommandBuffer) -> GpuResult<()> {
        self.transition_current(command_buffer, TextureLayout::Present)
    }

    /// Dispose every target now. The caller must know the device is idle.
    pub fn destroy(&mut self) {
        self.release_targets(|resource| resource.dispose());
    }

    fn transition_current(
        &mut self,
        command_buffer: &mut CommandBuffer,
        to: TextureLayout,
    ) -> GpuResult<()> {
        let index = self.image_index as usize;
        let target = self
            .color_targets
            .get(index)
            .ok_or(GpuError::ImageIndexOutOfRange {
                index: self.image_index,
                count: self.color_targets.len(),
            })?;
        let from = self.layouts[index];
        if from != to {
            command_buffer.transition_texture(target, from, to)?;
            self.layouts[index] = to;
        }
        Ok(())
    }

    fn release_targets(&mut self, mut release: impl FnMut(Arc<dyn RefCountedResource>)) {
        for framebuffer in self.framebuffers.drain(..) {
            release(framebuffer as Arc<dyn RefCountedResource>);
        }
        for color in self.color_targets.drain(..) {
            release(color as Arc<dyn RefCountedResource>);
        }
        if let Some(depth) = self.depth_target.take() {
            release(depth as Arc<dyn RefCountedResource>);
        }
        self.layouts.clear();
        self.outputs = None;
        self.image_index = 0;
    }

    fn build_targets(
        &self,
        built: &mut BuiltTargets,
        swapchain: SwapchainHandle,
        extent: Extent2d,
        color_format: TextureFormat,
    ) -> GpuResult<()> {
        let images = self.device.native().swapchain_images(swapchain)?;

        if let Some(format) = self.descriptor.depth_format {
            let mut descriptor = TextureDescriptor::new_2d(
                extent.width,
                extent.height,
                format,
                TextureUsage::DEPTH_STENCIL,
            );
            descriptor.label = Some(self.target_label("depth"));
            built.depth_target = Some(self.device.create_texture(&descriptor)?);
        }

        for image in images {
            let color = Arc::new(Texture::from_swap_image(
                self.device.native().clone(),
                image,
                color_format,
                extent,
            )?);
            built.color_targets.push(color.clone());

            let framebuffer = self
                .device
                .create_framebuffer(vec![color], built.depth_target.clone())?;
            built.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn target_label(&self, kind: &str) -> String {
        match &self.descriptor.label {
            Some(label) => format!("{label} {kind}"),
            None => format!("swap image {kind}"),
        }
    }
}

/// Targets of a rebuild in progress, committed only once complete.
#[derive(Default)]
struct BuiltTargets {
    color_targets: Vec<Arc<Texture>>,
    framebuffers: Vec<Arc<Framebuffer>>,
    depth_target: Option<Arc<Texture>>,
}

impl BuiltTargets {
    fn dispose(self) {
        for framebuffer in self.framebuffers {
            framebuffer.dispose();
        }
        for color in self.color_targets {
            color.dispose();
        }
        if let Some(depth) = self.depth_target {
            depth.dispose();
        }
    }
}

impl Drop for SwapImageTargetSet {
    fn drop(&mut self) {
        let device = self.device.clone();
        self.release_targets(|resource| device.dispose_when_idle(resource));
    }
}

impl std::fmt::Debug for SwapImageTargetSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapImageTargetSet")
            .field("extent", &self.extent)
            .field("color_format", &self.color_format)
            .field("images", &self.color_targets.len())
            .field("image_index", &self.image_index)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(SwapImageTargetSet: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::device::DeviceOptions;

    fn targets(depth: Option<TextureFormat>) -> (Arc<DummyDevice>, SwapImageTargetSet) {
        let dummy = Arc::new(DummyDevice::new());
        let device = GraphicsDevice::new(dummy.clone(), DeviceOptions::default());
        let descriptor = SwapImageTargetDescriptor {
            label: None,
            depth_format: depth,
        };
        (dummy, SwapImageTargetSet::new(device, descriptor))
    }

    #[test]
    fn test_builds_one_framebuffer_per_image() {
        let (dummy, mut targets) = targets(Some(TextureFormat::Depth32Float));
        let swapchain = dummy.create_swapchain(3);
        targets
            .set_new_swapchain(swapchain, Extent2d::new(800, 600), TextureFormat::Bgra8Unorm)
            .unwrap();

        assert_eq!(targets.image_count(), 3);
        assert_eq!(targets.framebuffers().len(), 3);
        let depth = targets.depth_target().unwrap();
        for framebuffer in targets.framebuffers() {
            assert!(Arc::ptr_eq(framebuffer.depth_target().unwrap(), depth));
            assert_eq!(framebuffer.extent(), Extent2d::new(800, 600));
        }
        assert_eq!(
            targets.outputs().unwrap().depth_format,
            Some(TextureFormat::Depth32Float)
        );
    }

    #[test]
    fn test_image_index_bounds() {
        let (dummy, mut targets) = targets(None);
        targets
            .set_new_swapchain(
                dummy.create_swapchain(2),
                Extent2d::new(64, 64),
                TextureFormat::Bgra8Unorm,
            )
            .unwrap();

        targets.set_image_index(1).unwrap();
        assert!(Arc::ptr_eq(
            targets.current_color_target().unwrap(),
            &targets.color_targets()[1]
        ));
        assert_eq!(
            targets.set_image_index(2),
            Err(GpuError::ImageIndexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(targets.image_index(), 1);
    }

    #[test]
    fn test_destroy_releases_views_but_not_swap_images() {
        let (dummy, mut targets) = targets(Some(TextureFormat::Depth24UnormStencil8));
        targets
            .set_new_swapchain(
                dummy.create_swapchain(2),
                Extent2d::new(64, 64),
                TextureFormat::Bgra8Unorm,
            )
            .unwrap();
        assert_eq!(dummy.live_texture_views(), 3);
        assert_eq!(dummy.live_textures(), 1);

        targets.destroy();
        assert_eq!(dummy.live_texture_views(), 0);
        assert_eq!(dummy.live_textures(), 0);
        assert_eq!(targets.image_count(), 0);
    }
}
