//! Reference-counted GPU objects.
//!
//! Each type owns native handles and implements
//! [`RefCountedResource`](crate::resource::RefCountedResource). Objects are
//! created through [`GraphicsDevice`](crate::GraphicsDevice) and shared as
//! `Arc`s; the native handles are released when the last reference is given
//! back, not when the last `Arc` is dropped.

mod buffer;
mod fence;
mod framebuffer;
mod pipeline;
mod texture;

pub use buffer::Buffer;
pub use fence::{Fence, WAIT_FOREVER};
pub use framebuffer::Framebuffer;
pub use pipeline::{Pipeline, ResourceSet};
pub use texture::Texture;
