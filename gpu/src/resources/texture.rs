//! GPU texture resource.

use std::sync::Arc;

use crate::backend::{NativeDevice, TextureHandle, TextureViewHandle};
use crate::error::GpuResult;
use crate::resource::{Destroyable, RefCount, RefCountedResource};
use crate::types::{Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

/// A 2D texture together with the view used to attach it.
///
/// A texture either owns its image (created through the device) or wraps an
/// image owned by a swapchain, in which case only the view is destroyed.
pub struct Texture {
    ref_count: RefCount,
    native: Arc<dyn NativeDevice>,
    handle: TextureHandle,
    view: TextureViewHandle,
    descriptor: TextureDescriptor,
    owns_image: bool,
}

impl Texture {
    pub(crate) fn new(
        native: Arc<dyn NativeDevice>,
        descriptor: TextureDescriptor,
    ) -> GpuResult<Self> {
        let handle = native.create_texture(&descriptor)?;
        let view = match native.create_texture_view(handle, descriptor.format) {
            Ok(view) => view,
            Err(e) => {
                native.destroy_texture(handle);
                return Err(e);
            }
        };
        Ok(Self {
            ref_count: RefCount::new(),
            native,
            handle,
            view,
            descriptor,
            owns_image: true,
        })
    }

    /// Wrap an image owned by a swapchain.
    pub(crate) fn from_swap_image(
        native: Arc<dyn NativeDevice>,
        image: TextureHandle,
        format: TextureFormat,
        extent: Extent2d,
    ) -> GpuResult<Self> {
        let view = native.create_texture_view(image, format)?;
        Ok(Self {
            ref_count: RefCount::new(),
            native,
            handle: image,
            view,
            descriptor: TextureDescriptor {
                label: Some("swap image".to_string()),
                extent,
                format,
                usage: TextureUsage::RENDER_TARGET | TextureUsage::PRESENT,
                sample_count: 1,
            },
            owns_image: false,
        })
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn view(&self) -> TextureViewHandle {
        self.view
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn extent(&self) -> Extent2d {
        self.descriptor.extent
    }

    pub fn width(&self) -> u32 {
        self.descriptor.extent.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.extent.height
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Whether the image belongs to a swapchain rather than this texture.
    pub fn is_swap_image(&self) -> bool {
        !self.owns_image
    }
}

impl Destroyable for Texture {
    fn destroy(&self) {
        log::trace!("Destroying texture {:?}", self.descriptor.label);
        self.native.destroy_texture_view(self.view);
        if self.owns_image {
            self.native.destroy_texture(self.handle);
        }
    }
}

impl RefCountedResource for Texture {
    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle)
            .field("extent", &self.descriptor.extent)
            .field("format", &self.descriptor.format)
            .field("owns_image", &self.owns_image)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;

    #[test]
    fn test_owned_texture_destroys_image_and_view() {
        let dummy = Arc::new(DummyDevice::new());
        let texture = Texture::new(
            dummy.clone(),
            TextureDescriptor::new_2d(64, 32, TextureFormat::Depth32Float, TextureUsage::DEPTH_STENCIL),
        )
        .unwrap();
        assert_eq!((texture.width(), texture.height()), (64, 32));
        assert_eq!(dummy.live_textures(), 1);
        assert_eq!(dummy.live_texture_views(), 1);

        texture.dispose();
        assert_eq!(dummy.live_textures(), 0);
        assert_eq!(dummy.live_texture_views(), 0);
    }

    #[test]
    fn test_swap_image_keeps_image() {
        let dummy = Arc::new(DummyDevice::new());
        let swapchain = dummy.create_swapchain(1);
        let image = dummy.swapchain_images(swapchain).unwrap()[0];

        let texture = Texture::from_swap_image(
            dummy.clone(),
            image,
            TextureFormat::Bgra8Unorm,
            Extent2d::new(800, 600),
        )
        .unwrap();
        assert!(texture.is_swap_image());
        assert_eq!(dummy.live_texture_views(), 1);

        texture.dispose();
        assert_eq!(dummy.live_texture_views(), 0);
        assert_eq!(dummy.swapchain_images(swapchain).unwrap(), vec![image]);
    }
}
